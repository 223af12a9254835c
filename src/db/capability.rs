//! The database capability abstraction.
//!
//! Tools and the protocol engine only ever see the [`Database`] trait; the
//! PostgreSQL driver stays behind it. This keeps the vendor dependency out of
//! the protocol and tool layers and allows an in-memory fake for tests.

use crate::error::BridgeResult;
use crate::store::ConnectionDescriptor;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

/// Lifecycle status of a database capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One column of a table, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// Result of the generic read-query executor.
///
/// Cells are stringified by the driver; `None` marks SQL NULL.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// The first cell of the first row, if any.
    pub fn first_cell(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }

    /// Rows as JSON objects keyed by column name. NULL cells become JSON null.
    pub fn objects(&self) -> Vec<JsonValue> {
        self.rows
            .iter()
            .map(|row| {
                let map: serde_json::Map<String, JsonValue> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, cell)| {
                        let value = match cell {
                            Some(text) => JsonValue::String(text.clone()),
                            None => JsonValue::Null,
                        };
                        (col.clone(), value)
                    })
                    .collect();
                JsonValue::Object(map)
            })
            .collect()
    }

    /// The named cell of a row, NULL and missing both mapping to `None`.
    pub fn cell<'a>(&self, row: &'a [Option<String>], column: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        row.get(idx)?.as_deref()
    }
}

/// A narrow capability over one PostgreSQL connection.
///
/// Implementations own the driver handle; it is valid only while the status
/// is [`ConnectionStatus::Connected`].
#[async_trait]
pub trait Database: Send + Sync + std::fmt::Debug {
    /// The descriptor this capability was built from.
    fn descriptor(&self) -> &ConnectionDescriptor;

    /// Current lifecycle status.
    fn status(&self) -> ConnectionStatus;

    /// Establish the connection, respecting the connect deadline.
    ///
    /// Deadline expiry is reported as a distinct timeout error so callers can
    /// tell "wrong credentials" from "host unreachable".
    async fn connect(&self, token: CancellationToken) -> BridgeResult<()>;

    /// Release the driver handle and return to `Disconnected`.
    async fn disconnect(&self) -> BridgeResult<()>;

    /// Cheap liveness probe.
    async fn ping(&self) -> BridgeResult<()>;

    /// User schemas, system schemas excluded.
    async fn list_schemas(&self) -> BridgeResult<Vec<String>>;

    /// Base tables in a schema.
    async fn list_tables(&self, schema: &str) -> BridgeResult<Vec<String>>;

    /// Views in a schema.
    async fn list_views(&self, schema: &str) -> BridgeResult<Vec<String>>;

    /// Functions in a schema.
    async fn list_functions(&self, schema: &str) -> BridgeResult<Vec<String>>;

    /// Column definitions for one table.
    async fn table_columns(&self, schema: &str, table: &str) -> BridgeResult<Vec<ColumnInfo>>;

    /// Execute an arbitrary read query and stringify the result set.
    async fn execute_query(
        &self,
        token: &CancellationToken,
        sql: &str,
    ) -> BridgeResult<QueryResult>;
}
