//! Per-call resolution of the active database connection.
//!
//! Every tool invocation goes through [`ActiveResolver::resolve`], which
//! re-reads the descriptor store, folds newly discovered descriptors into the
//! broker, picks the effective connection (CLI override first, then the
//! store's selector) and lazily connects it. Because the store is consulted on
//! every call, an external change of the active connection between two tool
//! calls is honored on the second call without restarting the bridge, while
//! an unchanged selection never forces a reconnect.

use crate::broker::ConnectionBroker;
use crate::db::{ConnectionStatus, Database, PgDatabase};
use crate::error::{BridgeError, BridgeResult};
use crate::store::{ConnectionDescriptor, StoreSnapshot};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The resolver seam tools depend on, so tests can substitute a fake.
#[async_trait]
pub trait ResolveConnection: Send + Sync {
    /// Produce a currently-connected capability honoring the latest on-disk
    /// selection.
    async fn resolve(&self) -> BridgeResult<Arc<dyn Database>>;
}

/// Factory turning a descriptor into a capability instance.
pub type Connector = Box<dyn Fn(ConnectionDescriptor) -> Arc<dyn Database> + Send + Sync>;

pub struct ActiveResolver {
    store_path: PathBuf,
    override_name: Option<String>,
    broker: Mutex<ConnectionBroker>,
    connector: Connector,
}

impl ActiveResolver {
    /// Create a resolver backed by PostgreSQL capabilities.
    pub fn new(store_path: PathBuf, override_name: Option<String>) -> Self {
        Self::with_connector(
            store_path,
            override_name,
            Box::new(|descriptor| Arc::new(PgDatabase::new(descriptor)) as Arc<dyn Database>),
        )
    }

    /// Create a resolver with a custom capability factory.
    pub fn with_connector(
        store_path: PathBuf,
        override_name: Option<String>,
        connector: Connector,
    ) -> Self {
        Self {
            store_path,
            override_name: override_name.filter(|s| !s.is_empty()),
            broker: Mutex::new(ConnectionBroker::new()),
            connector,
        }
    }

    /// Access the broker, e.g. for startup listing.
    pub fn broker(&self) -> MutexGuard<'_, ConnectionBroker> {
        self.broker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ResolveConnection for ActiveResolver {
    async fn resolve(&self) -> BridgeResult<Arc<dyn Database>> {
        let snapshot = StoreSnapshot::load(&self.store_path).await?;

        let capability = {
            let mut broker = self.broker();

            // Fold in descriptors we have not seen yet. Existing entries are
            // left untouched so their open driver handles survive.
            for descriptor in &snapshot.connections {
                if !broker.contains(&descriptor.name) {
                    debug!(connection = %descriptor.name, "Registering connection from store");
                    broker.add(descriptor.name.clone(), (self.connector)(descriptor.clone()));
                }
            }

            if let Some(active) = snapshot.active() {
                // Keep the broker's slot in sync with the store; a dangling
                // selector is reported below as connection-not-found.
                let _ = broker.set_active(active);
            }

            let effective = self
                .override_name
                .clone()
                .or_else(|| snapshot.active().map(String::from))
                .unwrap_or_default();
            if effective.is_empty() {
                return Err(BridgeError::NoActiveConnection);
            }

            broker
                .get(&effective)
                .ok_or_else(|| BridgeError::connection_not_found(&effective))?
        };

        if capability.status() != ConnectionStatus::Connected {
            capability.connect(CancellationToken::new()).await?;
        }

        Ok(capability)
    }
}
