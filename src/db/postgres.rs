//! PostgreSQL-backed database capability.
//!
//! Wraps a sqlx connection pool behind the [`Database`] trait. The pool is
//! created lazily by `connect` and lives only while the capability is in the
//! `Connected` state.

use crate::config::DEFAULT_CONNECT_TIMEOUT_SECS;
use crate::db::capability::{ColumnInfo, ConnectionStatus, Database, QueryResult};
use crate::db::types::decode_cell;
use crate::error::{BridgeError, BridgeResult};
use crate::store::ConnectionDescriptor;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Column, PgPool, Row};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub const LIST_SCHEMAS: &str = r#"
        SELECT schema_name FROM information_schema.schemata
        WHERE schema_name NOT IN ('pg_catalog', 'information_schema')
        AND schema_name NOT LIKE 'pg_toast%'
        AND schema_name NOT LIKE 'pg_temp%'
        ORDER BY schema_name
        "#;

    pub const LIST_TABLES: &str = r#"
        SELECT table_name FROM information_schema.tables
        WHERE table_schema = $1 AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#;

    pub const LIST_VIEWS: &str = r#"
        SELECT table_name FROM information_schema.tables
        WHERE table_schema = $1 AND table_type = 'VIEW'
        ORDER BY table_name
        "#;

    pub const LIST_FUNCTIONS: &str = r#"
        SELECT DISTINCT p.proname
        FROM pg_proc p
        JOIN pg_namespace n ON n.oid = p.pronamespace
        WHERE n.nspname = $1
        ORDER BY p.proname
        "#;

    pub const TABLE_COLUMNS: &str = r#"
        SELECT
            c.column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            c.is_nullable,
            c.column_default
        FROM information_schema.columns c
        JOIN pg_class t ON t.relname = c.table_name
        JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
        WHERE c.table_name = $1 AND c.table_schema = $2
        ORDER BY c.ordinal_position
        "#;
}

/// PostgreSQL implementation of the database capability.
pub struct PgDatabase {
    descriptor: ConnectionDescriptor,
    status: RwLock<ConnectionStatus>,
    pool: RwLock<Option<PgPool>>,
}

impl PgDatabase {
    /// Create a capability in the `Disconnected` state.
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            descriptor,
            status: RwLock::new(ConnectionStatus::Disconnected),
            pool: RwLock::new(None),
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        *write_lock(&self.status) = status;
    }

    /// Clone the live pool, or fail if the capability is not connected.
    fn pool(&self) -> BridgeResult<PgPool> {
        read_lock(&self.pool).clone().ok_or_else(|| {
            BridgeError::connection(
                format!("connection '{}' is not connected", self.descriptor.name),
                "Connect before issuing queries",
            )
        })
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.descriptor.host)
            .port(self.descriptor.port)
            .database(&self.descriptor.database)
            .username(&self.descriptor.username)
            .password(&self.descriptor.password)
            .ssl_mode(parse_ssl_mode(&self.descriptor.ssl_mode))
    }
}

impl std::fmt::Debug for PgDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDatabase")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

#[async_trait]
impl Database for PgDatabase {
    fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    fn status(&self) -> ConnectionStatus {
        *read_lock(&self.status)
    }

    async fn connect(&self, token: CancellationToken) -> BridgeResult<()> {
        self.set_status(ConnectionStatus::Connecting);

        let deadline = Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS);
        let connect = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(deadline)
            .connect_with(self.connect_options());

        let result = tokio::select! {
            _ = token.cancelled() => {
                self.set_status(ConnectionStatus::Error);
                return Err(BridgeError::internal("connect cancelled"));
            }
            result = timeout(deadline, connect) => result,
        };

        let pool = match result {
            Err(_) => {
                self.set_status(ConnectionStatus::Error);
                return Err(BridgeError::ConnectTimeout {
                    elapsed_secs: deadline.as_secs(),
                });
            }
            Ok(Err(e)) => {
                self.set_status(ConnectionStatus::Error);
                let suggestion = connection_suggestion(&e);
                return Err(BridgeError::connection(
                    format!("Failed to connect: {e}"),
                    suggestion,
                ));
            }
            Ok(Ok(pool)) => pool,
        };

        *write_lock(&self.pool) = Some(pool);
        self.set_status(ConnectionStatus::Connected);
        info!(
            connection = %self.descriptor.name,
            host = %self.descriptor.host,
            database = %self.descriptor.database,
            "Connected to PostgreSQL"
        );
        Ok(())
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        let pool = write_lock(&self.pool).take();
        if let Some(pool) = pool {
            pool.close().await;
        }
        self.set_status(ConnectionStatus::Disconnected);
        info!(connection = %self.descriptor.name, "Disconnected");
        Ok(())
    }

    async fn ping(&self) -> BridgeResult<()> {
        let pool = self.pool()?;
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&pool)
            .await?;
        Ok(())
    }

    async fn list_schemas(&self) -> BridgeResult<Vec<String>> {
        let pool = self.pool()?;
        let schemas = sqlx::query_scalar::<_, String>(queries::LIST_SCHEMAS)
            .fetch_all(&pool)
            .await?;
        debug!(count = schemas.len(), "Listed schemas");
        Ok(schemas)
    }

    async fn list_tables(&self, schema: &str) -> BridgeResult<Vec<String>> {
        let pool = self.pool()?;
        let tables = sqlx::query_scalar::<_, String>(queries::LIST_TABLES)
            .bind(schema)
            .fetch_all(&pool)
            .await?;
        debug!(count = tables.len(), schema = %schema, "Listed tables");
        Ok(tables)
    }

    async fn list_views(&self, schema: &str) -> BridgeResult<Vec<String>> {
        let pool = self.pool()?;
        let views = sqlx::query_scalar::<_, String>(queries::LIST_VIEWS)
            .bind(schema)
            .fetch_all(&pool)
            .await?;
        Ok(views)
    }

    async fn list_functions(&self, schema: &str) -> BridgeResult<Vec<String>> {
        let pool = self.pool()?;
        let functions = sqlx::query_scalar::<_, String>(queries::LIST_FUNCTIONS)
            .bind(schema)
            .fetch_all(&pool)
            .await?;
        Ok(functions)
    }

    async fn table_columns(&self, schema: &str, table: &str) -> BridgeResult<Vec<ColumnInfo>> {
        let pool = self.pool()?;
        let rows = sqlx::query(queries::TABLE_COLUMNS)
            .bind(table)
            .bind(schema)
            .fetch_all(&pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let nullable: String = row.get("is_nullable");
                ColumnInfo {
                    name: row.get("column_name"),
                    data_type: row.get("column_type"),
                    nullable: nullable == "YES",
                    default: row.try_get("column_default").ok().flatten(),
                }
            })
            .collect())
    }

    async fn execute_query(
        &self,
        token: &CancellationToken,
        sql: &str,
    ) -> BridgeResult<QueryResult> {
        let pool = self.pool()?;
        let start = Instant::now();
        debug!(sql = %sql, "Executing query");

        let rows = tokio::select! {
            _ = token.cancelled() => {
                return Err(BridgeError::internal("query cancelled"));
            }
            rows = sqlx::query(sql).fetch_all(&pool) => rows.map_err(BridgeError::from)?,
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        if rows.is_empty() {
            return Ok(QueryResult {
                columns: Vec::new(),
                rows: Vec::new(),
                execution_time_ms,
            });
        }

        let columns: Vec<String> = rows[0]
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let data = rows
            .iter()
            .map(|row| (0..columns.len()).map(|idx| decode_cell(row, idx)).collect())
            .collect();

        debug!(
            rows = rows.len(),
            elapsed_ms = execution_time_ms,
            "Query complete"
        );
        Ok(QueryResult {
            columns,
            rows: data,
            execution_time_ms,
        })
    }
}

fn parse_ssl_mode(mode: &str) -> PgSslMode {
    match mode.to_lowercase().as_str() {
        "disable" => PgSslMode::Disable,
        "allow" => PgSslMode::Allow,
        "require" => PgSslMode::Require,
        "verify-ca" => PgSslMode::VerifyCa,
        "verify-full" => PgSslMode::VerifyFull,
        _ => PgSslMode::Prefer,
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the PostgreSQL server is running and accessible".to_string();
    }
    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the username and password in the connection settings".to_string();
    }
    if error_str.contains("does not exist") {
        return "Check that the database name exists".to_string();
    }
    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check the SSL mode setting or try disabling it".to_string();
    }

    "Verify the host, port and database in the connection settings".to_string()
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
