//! The introspection tool catalog.
//!
//! Tools are grouped the way the catalog advertises them:
//! - `basic`: table listing, schema, search, sampling, counting
//! - `ddl`: table/view/function definitions
//! - `indexes`: index inventory, sizes, query plans
//! - `relationships`: foreign keys, constraints, dependent objects
//! - `triggers`: trigger inventory and definitions
//! - `stats`: planner and activity statistics
//! - `discovery`: sequences, materialized views, reference maps
//!
//! Every tool resolves the active connection per call, composes capability
//! operations and returns pretty-printed JSON (DDL output is raw text).

pub mod args;
pub mod basic;
pub mod ddl;
pub mod discovery;
pub mod indexes;
pub mod relationships;
pub mod stats;
pub mod triggers;

use crate::error::{BridgeError, BridgeResult};
use crate::mcp::registry::ToolRegistry;
use crate::resolver::ResolveConnection;
use std::sync::Arc;

/// Register the complete 21-tool catalog.
pub fn register_all(registry: &ToolRegistry, resolver: &Arc<dyn ResolveConnection>) {
    basic::register(registry, resolver);
    ddl::register(registry, resolver);
    indexes::register(registry, resolver);
    relationships::register(registry, resolver);
    triggers::register(registry, resolver);
    stats::register(registry, resolver);
    discovery::register(registry, resolver);
}

/// Serialize a payload as the 2-space-indented JSON every tool returns.
pub(crate) fn pretty<T: serde::Serialize>(value: &T) -> BridgeResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BridgeError::internal(format!("failed to serialize payload: {e}")))
}
