//! Connection broker.
//!
//! An in-memory mapping from connection name to a database capability plus a
//! single "active name" slot. The broker is populated at startup and grown by
//! the resolver as new descriptors appear in the store; the protocol loop is
//! single-threaded, so the resolver serializes all access behind its own lock.

use crate::db::Database;
use crate::error::{BridgeError, BridgeResult};
use crate::store::ConnectionDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ConnectionBroker {
    connections: HashMap<String, Arc<dyn Database>>,
    active: String,
}

impl ConnectionBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under a name, overwriting any previous entry.
    pub fn add(&mut self, name: impl Into<String>, capability: Arc<dyn Database>) {
        self.connections.insert(name.into(), capability);
    }

    /// Look up a capability by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Database>> {
        self.connections.get(name).cloned()
    }

    /// Check whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    /// Mark a registered connection as active. Fails for unknown names.
    pub fn set_active(&mut self, name: &str) -> BridgeResult<()> {
        if !self.connections.contains_key(name) {
            return Err(BridgeError::connection_not_found(name));
        }
        self.active = name.to_string();
        Ok(())
    }

    /// The capability marked active. Fails when the slot is empty.
    pub fn get_active(&self) -> BridgeResult<Arc<dyn Database>> {
        if self.active.is_empty() {
            return Err(BridgeError::NoActiveConnection);
        }
        self.get(&self.active)
            .ok_or_else(|| BridgeError::connection_not_found(&self.active))
    }

    /// Name currently in the active slot; empty when unset.
    pub fn active_name(&self) -> &str {
        &self.active
    }

    /// Registered names, sorted lexicographically for stable output.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a connection, clearing the active slot if it was the one removed.
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Database>> {
        let removed = self.connections.remove(name);
        if removed.is_some() && self.active == name {
            self.active.clear();
        }
        removed
    }

    /// Bulk export of every registered descriptor, in list order.
    pub fn configs(&self) -> Vec<ConnectionDescriptor> {
        self.list()
            .iter()
            .filter_map(|name| self.connections.get(name))
            .map(|capability| capability.descriptor().clone())
            .collect()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True when no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
