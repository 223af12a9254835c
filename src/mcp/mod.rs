//! MCP protocol layer: wire types, tool registry and the request loop.

pub mod engine;
pub mod protocol;
pub mod registry;
pub mod schema;

pub use engine::ProtocolEngine;
pub use protocol::{ContentBlock, InitializeResult, JsonRpcResponse, ToolCallResult, PROTOCOL_VERSION};
pub use registry::{handler, ToolArguments, ToolHandler, ToolRegistry};
pub use schema::ToolDescriptor;
