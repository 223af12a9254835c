//! Tool descriptors and their input schemas.
//!
//! Schemas are the JSON-Schema subset MCP clients understand: an `"object"`
//! with typed properties (description, optional enum, optional default) and a
//! list of required property names. Descriptors are built by hand at
//! registration time; there is one per tool.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Advertised description of one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

/// The `inputSchema` object of a tool descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// One property of an input schema.
#[derive(Debug, Clone, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: &'static str,
    pub description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ToolDescriptor {
    /// Start a descriptor with an empty object schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema {
                schema_type: "object",
                properties: BTreeMap::new(),
                required: Vec::new(),
            },
        }
    }

    fn property(
        mut self,
        name: &str,
        property_type: &'static str,
        description: impl Into<String>,
        allowed: Option<Vec<String>>,
        default: Option<Value>,
        required: bool,
    ) -> Self {
        self.input_schema.properties.insert(
            name.to_string(),
            PropertySchema {
                property_type,
                description: description.into(),
                allowed,
                default,
            },
        );
        if required {
            self.input_schema.required.push(name.to_string());
        }
        self
    }

    /// Add a required string property.
    pub fn required_string(self, name: &str, description: impl Into<String>) -> Self {
        self.property(name, "string", description, None, None, true)
    }

    /// Add an optional string property.
    pub fn optional_string(self, name: &str, description: impl Into<String>) -> Self {
        self.property(name, "string", description, None, None, false)
    }

    /// Add an optional string property with a default.
    pub fn optional_string_default(
        self,
        name: &str,
        description: impl Into<String>,
        default: &str,
    ) -> Self {
        self.property(
            name,
            "string",
            description,
            None,
            Some(Value::String(default.to_string())),
            false,
        )
    }

    /// Add an optional boolean property with a default.
    pub fn optional_bool(self, name: &str, description: impl Into<String>, default: bool) -> Self {
        self.property(name, "boolean", description, None, Some(Value::Bool(default)), false)
    }

    /// Add an optional integer property with a default.
    pub fn optional_integer(
        self,
        name: &str,
        description: impl Into<String>,
        default: i64,
    ) -> Self {
        self.property(
            name,
            "integer",
            description,
            None,
            Some(Value::from(default)),
            false,
        )
    }

    /// Add an optional enum-constrained string property with a default.
    pub fn enum_string(
        self,
        name: &str,
        description: impl Into<String>,
        values: &[&str],
        default: &str,
    ) -> Self {
        self.property(
            name,
            "string",
            description,
            Some(values.iter().map(|v| v.to_string()).collect()),
            Some(Value::String(default.to_string())),
            false,
        )
    }
}
