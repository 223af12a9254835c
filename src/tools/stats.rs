//! Statistics tools: planner column statistics and table activity counters.
//!
//! Timestamps and estimates are cast to text server-side and forwarded
//! verbatim; the bridge never reparses them.

use crate::error::BridgeError;
use crate::mcp::registry::{handler, ToolRegistry};
use crate::mcp::schema::ToolDescriptor;
use crate::resolver::ResolveConnection;
use crate::tools::args::{optional_str, quote_literal, require_str, split_table_name};
use crate::tools::pretty;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn register(registry: &ToolRegistry, resolver: &Arc<dyn ResolveConnection>) {
    register_get_column_stats(registry, Arc::clone(resolver));
    register_get_table_stats(registry, Arc::clone(resolver));
}

fn register_get_column_stats(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_column_stats",
        "Read planner statistics per column: null fraction, distinct estimate, width and most common values.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)")
    .optional_string("column_name", "Restrict to one column");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let column = optional_str(&args, "column_name");
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let mut sql = format!(
                    "SELECT attname AS column_name, null_frac::text AS null_frac, \
                            n_distinct::text AS n_distinct, avg_width::text AS avg_width, \
                            most_common_vals::text AS most_common_vals, \
                            most_common_freqs::text AS most_common_freqs \
                     FROM pg_stats \
                     WHERE schemaname = {} AND tablename = {}",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                if let Some(column) = &column {
                    sql.push_str(&format!(" AND attname = {}", quote_literal(column)));
                }
                sql.push_str(" ORDER BY attname");

                let result = db.execute_query(&token, &sql).await?;
                pretty(&json!({
                    "table": table,
                    "schema": schema,
                    "columns": result.objects(),
                }))
            }
        }),
    );
}

fn register_get_table_stats(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_stats",
        "Read table activity statistics: live/dead tuples, write counters and vacuum/analyze history.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let sql = format!(
                    "SELECT n_live_tup::text AS live_tuples, n_dead_tup::text AS dead_tuples, \
                            n_tup_ins::text AS inserts, n_tup_upd::text AS updates, \
                            n_tup_del::text AS deletes, \
                            last_vacuum::text AS last_vacuum, \
                            last_autovacuum::text AS last_autovacuum, \
                            last_analyze::text AS last_analyze, \
                            last_autoanalyze::text AS last_autoanalyze, \
                            vacuum_count::text AS vacuum_count, \
                            autovacuum_count::text AS autovacuum_count, \
                            analyze_count::text AS analyze_count, \
                            autoanalyze_count::text AS autoanalyze_count \
                     FROM pg_stat_user_tables \
                     WHERE schemaname = {} AND relname = {}",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                let result = db.execute_query(&token, &sql).await?;
                let mut stats = result
                    .objects()
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        BridgeError::database(
                            format!("no statistics found for table '{schema}.{table}'"),
                            None,
                        )
                    })?;

                if let Value::Object(map) = &mut stats {
                    map.insert("table".to_string(), json!(table));
                    map.insert("schema".to_string(), json!(schema));
                }
                pretty(&stats)
            }
        }),
    );
}
