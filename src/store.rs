//! On-disk connection descriptor store.
//!
//! The store is a JSON document holding the named connection descriptors and
//! the currently-active selector. It is written exclusively by the companion
//! terminal UI; the bridge re-reads it on every tool call so an external
//! change of the active connection takes effect without a restart.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deployment environment tag for a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// A named PostgreSQL connection descriptor.
///
/// Field names are PascalCase on the wire to match the store format shared
/// with the terminal UI. The password is opaque ciphertext at rest; the
/// bridge passes it through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Database")]
    pub database: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password", default)]
    pub password: String,
    #[serde(rename = "SSLMode", default = "default_ssl_mode")]
    pub ssl_mode: String,
    #[serde(rename = "Environment", default)]
    pub environment: Environment,
}

fn default_ssl_mode() -> String {
    "prefer".to_string()
}

/// A point-in-time snapshot of the descriptor store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub connections: Vec<ConnectionDescriptor>,
    #[serde(default)]
    pub active_connection: String,
}

impl StoreSnapshot {
    /// Parse a snapshot from raw JSON, enforcing the name invariants.
    pub fn parse(raw: &str) -> BridgeResult<Self> {
        let snapshot: Self =
            serde_json::from_str(raw).map_err(|e| BridgeError::store(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Read and parse the store file.
    pub async fn load(path: &Path) -> BridgeResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BridgeError::store(format!("{}: {e}", path.display())))?;
        Self::parse(&raw)
    }

    /// The active selector, if non-empty.
    pub fn active(&self) -> Option<&str> {
        if self.active_connection.is_empty() {
            None
        } else {
            Some(&self.active_connection)
        }
    }

    /// Look up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ConnectionDescriptor> {
        self.connections.iter().find(|c| c.name == name)
    }

    /// Descriptor names must be non-empty and unique.
    fn validate(&self) -> BridgeResult<()> {
        let mut seen = std::collections::HashSet::new();
        for desc in &self.connections {
            if desc.name.is_empty() {
                return Err(BridgeError::store("connection with empty name"));
            }
            if !seen.insert(desc.name.as_str()) {
                return Err(BridgeError::store(format!(
                    "duplicate connection name '{}'",
                    desc.name
                )));
            }
        }
        Ok(())
    }
}
