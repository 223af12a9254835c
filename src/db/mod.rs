//! Database capability layer.
//!
//! The [`Database`] trait is the only surface the protocol and tool layers
//! see; [`PgDatabase`] keeps the sqlx driver behind it.

pub mod capability;
pub mod postgres;
pub mod types;

pub use capability::{ColumnInfo, ConnectionStatus, Database, QueryResult};
pub use postgres::PgDatabase;
