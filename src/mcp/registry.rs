//! Tool registry.
//!
//! A thread-safe map from tool name to (descriptor, handler). Registration
//! happens once at startup; reads dominate afterwards, so a reader-writer
//! lock guards the table.

use crate::error::{BridgeError, BridgeResult};
use crate::mcp::schema::ToolDescriptor;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// The untyped argument bag a tool receives.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// Future returned by a tool handler.
pub type ToolFuture = BoxFuture<'static, BridgeResult<String>>;

/// A tool handler: cancellation token + argument bag in, text payload out.
pub type ToolHandler = Box<dyn Fn(CancellationToken, ToolArguments) -> ToolFuture + Send + Sync>;

/// Box an async closure into a [`ToolHandler`].
pub fn handler<F, Fut>(f: F) -> ToolHandler
where
    F: Fn(CancellationToken, ToolArguments) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = BridgeResult<String>> + Send + 'static,
{
    Box::new(move |token, args| f(token, args).boxed())
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

/// Thread-safe name -> (descriptor, handler) table.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<RegisteredTool>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. The last write wins on a duplicate name.
    pub fn register(&self, descriptor: ToolDescriptor, handler: ToolHandler) {
        let name = descriptor.name.clone();
        let entry = Arc::new(RegisteredTool {
            descriptor,
            handler,
        });
        self.write().insert(name, entry);
    }

    /// Snapshot of every registered descriptor (unordered).
    pub fn get_all(&self) -> Vec<ToolDescriptor> {
        self.read()
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Look up one descriptor by name.
    pub fn get(&self, name: &str) -> Option<ToolDescriptor> {
        self.read().get(name).map(|entry| entry.descriptor.clone())
    }

    /// Check whether a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Number of registered tools.
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Execute a tool by name. Unknown names are an error, never a panic.
    pub async fn execute(
        &self,
        token: CancellationToken,
        name: &str,
        arguments: ToolArguments,
    ) -> BridgeResult<String> {
        let entry = self
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::tool_not_found(name))?;
        (entry.handler)(token, arguments).await
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<RegisteredTool>>> {
        self.tools.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<RegisteredTool>>> {
        self.tools.write().unwrap_or_else(|e| e.into_inner())
    }
}
