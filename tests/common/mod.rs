//! Shared test fixtures: an in-memory database capability and a fixed
//! resolver, so protocol and tool behavior is testable without a live server.

#![allow(dead_code)]

use async_trait::async_trait;
use lazydb_mcp::db::{ColumnInfo, ConnectionStatus, Database, QueryResult};
use lazydb_mcp::error::{BridgeError, BridgeResult};
use lazydb_mcp::resolver::ResolveConnection;
use lazydb_mcp::store::{ConnectionDescriptor, Environment};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub fn descriptor(name: &str) -> ConnectionDescriptor {
    ConnectionDescriptor {
        name: name.to_string(),
        host: "localhost".to_string(),
        port: 5432,
        database: "app".to_string(),
        username: "dev".to_string(),
        password: String::new(),
        ssl_mode: "disable".to_string(),
        environment: Environment::Development,
    }
}

/// Build a QueryResult from string literals.
pub fn query_result(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> QueryResult {
    QueryResult {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.map(String::from)).collect())
            .collect(),
        execution_time_ms: 1,
    }
}

/// Scripted in-memory database capability.
///
/// `execute_query` records every SQL statement and answers with the first
/// script whose key is a substring of the statement; unmatched statements get
/// an empty result.
pub struct FakeDatabase {
    descriptor: ConnectionDescriptor,
    status: Mutex<ConnectionStatus>,
    fail_connect: bool,
    pub connect_calls: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
    schemas: Vec<String>,
    tables: HashMap<String, Vec<String>>,
    views: HashMap<String, Vec<String>>,
    functions: HashMap<String, Vec<String>>,
    columns: HashMap<(String, String), Vec<ColumnInfo>>,
    scripts: Vec<(String, QueryResult)>,
}

impl FakeDatabase {
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: descriptor(name),
            status: Mutex::new(ConnectionStatus::Disconnected),
            fail_connect: false,
            connect_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            schemas: Vec::new(),
            tables: HashMap::new(),
            views: HashMap::new(),
            functions: HashMap::new(),
            columns: HashMap::new(),
            scripts: Vec::new(),
        }
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn with_schema(mut self, schema: &str, tables: &[&str]) -> Self {
        self.schemas.push(schema.to_string());
        self.tables.insert(
            schema.to_string(),
            tables.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn with_columns(mut self, schema: &str, table: &str, columns: Vec<ColumnInfo>) -> Self {
        self.columns
            .insert((schema.to_string(), table.to_string()), columns);
        self
    }

    pub fn with_script(mut self, sql_fragment: &str, result: QueryResult) -> Self {
        self.scripts.push((sql_fragment.to_string(), result));
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries_containing(&self, fragment: &str) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.contains(fragment))
            .cloned()
            .collect()
    }

    pub fn last_query(&self) -> Option<String> {
        self.queries.lock().unwrap().last().cloned()
    }
}

impl std::fmt::Debug for FakeDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeDatabase")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

#[async_trait]
impl Database for FakeDatabase {
    fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.lock().unwrap()
    }

    async fn connect(&self, _token: CancellationToken) -> BridgeResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            *self.status.lock().unwrap() = ConnectionStatus::Error;
            return Err(BridgeError::connection(
                "Failed to connect: simulated refusal",
                "Check that the PostgreSQL server is running and accessible",
            ));
        }
        *self.status.lock().unwrap() = ConnectionStatus::Connected;
        Ok(())
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        *self.status.lock().unwrap() = ConnectionStatus::Disconnected;
        Ok(())
    }

    async fn ping(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn list_schemas(&self) -> BridgeResult<Vec<String>> {
        Ok(self.schemas.clone())
    }

    async fn list_tables(&self, schema: &str) -> BridgeResult<Vec<String>> {
        Ok(self.tables.get(schema).cloned().unwrap_or_default())
    }

    async fn list_views(&self, schema: &str) -> BridgeResult<Vec<String>> {
        Ok(self.views.get(schema).cloned().unwrap_or_default())
    }

    async fn list_functions(&self, schema: &str) -> BridgeResult<Vec<String>> {
        Ok(self.functions.get(schema).cloned().unwrap_or_default())
    }

    async fn table_columns(&self, schema: &str, table: &str) -> BridgeResult<Vec<ColumnInfo>> {
        Ok(self
            .columns
            .get(&(schema.to_string(), table.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn execute_query(
        &self,
        _token: &CancellationToken,
        sql: &str,
    ) -> BridgeResult<QueryResult> {
        self.queries.lock().unwrap().push(sql.to_string());
        for (fragment, result) in &self.scripts {
            if sql.contains(fragment.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(QueryResult::default())
    }
}

/// Resolver that always hands out the same capability.
pub struct FixedResolver {
    pub db: Arc<FakeDatabase>,
}

impl FixedResolver {
    pub fn new(db: Arc<FakeDatabase>) -> Arc<dyn ResolveConnection> {
        Arc::new(Self { db })
    }
}

#[async_trait]
impl ResolveConnection for FixedResolver {
    async fn resolve(&self) -> BridgeResult<Arc<dyn Database>> {
        Ok(self.db.clone())
    }
}
