//! Error types for the lazydb MCP bridge.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. Every failure that reaches the protocol engine is serialized into
//! a JSON-RPC error response; `jsonrpc_code` picks the wire code for each
//! variant.

use thiserror::Error;

/// Standard JSON-RPC 2.0 error codes.
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to load connections: {message}")]
    Store { message: String },

    #[error("no active connection specified")]
    NoActiveConnection,

    #[error("connection '{name}' not found")]
    ConnectionNotFound { name: String },

    #[error("Connection failed: {message}. {suggestion}")]
    Connection { message: String, suggestion: String },

    #[error("connection timeout after {elapsed_secs}s")]
    ConnectTimeout { elapsed_secs: u64 },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("{name} parameter is required")]
    MissingArgument { name: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Server not initialized")]
    NotInitialized,

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    /// A tool declined to run, e.g. `explain_query` on a non-SELECT statement.
    #[error("{message}")]
    Refused { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BridgeError {
    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a connection not found error.
    pub fn connection_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionNotFound { name: name.into() }
    }

    /// Create a database error with optional SQLSTATE code.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a missing argument error.
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a tool not found error.
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create a refusal error.
    pub fn refused(message: impl Into<String>) -> Self {
        Self::Refused {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The JSON-RPC error code this failure is reported under.
    pub fn jsonrpc_code(&self) -> i32 {
        match self {
            Self::NotInitialized => INVALID_REQUEST,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::MissingArgument { .. } | Self::InvalidArgument { .. } => INVALID_PARAMS,
            _ => INTERNAL_ERROR,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::ConnectTimeout { .. })
    }
}

/// Convert sqlx errors to BridgeError.
impl From<sqlx::Error> for BridgeError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => BridgeError::connection(
                msg.to_string(),
                "Check the connection parameters and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                BridgeError::database(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => BridgeError::database("No rows returned", None),
            sqlx::Error::PoolTimedOut => BridgeError::ConnectTimeout { elapsed_secs: 30 },
            sqlx::Error::PoolClosed => {
                BridgeError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => BridgeError::connection(
                format!("I/O error: {io_err}"),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => BridgeError::connection(
                format!("TLS error: {tls_err}"),
                "Verify the SSL mode and certificates",
            ),
            sqlx::Error::Protocol(msg) => BridgeError::connection(
                format!("Protocol error: {msg}"),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                BridgeError::internal(format!("Column not found: {col}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                BridgeError::internal(format!("Column index {index} out of bounds (len: {len})"))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                BridgeError::internal(format!("Failed to decode column {index}: {source}"))
            }
            sqlx::Error::Decode(source) => BridgeError::internal(format!("Decode error: {source}")),
            sqlx::Error::WorkerCrashed => BridgeError::internal("Database worker crashed"),
            _ => BridgeError::internal(format!("Unknown database error: {err}")),
        }
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
