//! lazydb MCP bridge library.
//!
//! A stdio bridge between AI coding assistants and PostgreSQL: JSON-RPC 2.0
//! framing per the Model Context Protocol, a registry of 21 read-only
//! introspection tools, and a per-call resolver that follows the externally
//! managed connection store.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod resolver;
pub mod store;
pub mod tools;

pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use mcp::{ProtocolEngine, ToolRegistry};
