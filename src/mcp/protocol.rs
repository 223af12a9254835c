//! JSON-RPC 2.0 / MCP wire types.
//!
//! The bridge speaks JSON-RPC 2.0 over stdio: one JSON object per line in,
//! one per line out. Requests carry an `id` that is echoed unchanged in the
//! response; objects without an `id` are notifications and never get one.

use crate::config::{SERVER_NAME, SERVER_VERSION};
use serde::Serialize;
use serde_json::Value;

/// Protocol version advertised in the `initialize` response.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    /// Request ID (echoed from request).
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Server information returned in the `initialize` response.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// Tool capability flags advertised to the peer.
#[derive(Debug, Serialize)]
pub struct ToolsCapability {
    pub list: bool,
    pub call: bool,
}

/// Capabilities advertised to the peer.
#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

/// Result of the `initialize` method.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: &'static str,
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
}

impl InitializeResult {
    /// The handshake payload for this server build.
    pub fn current() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: SERVER_VERSION,
            },
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list: true,
                    call: true,
                },
            },
        }
    }
}

/// One item of a `tools/call` result's content array.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Result of the `tools/call` method.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
}

impl ToolCallResult {
    /// Wrap a textual payload in a single text content block.
    pub fn text(text: String) -> Self {
        Self {
            content: vec![ContentBlock::Text { text }],
        }
    }
}
