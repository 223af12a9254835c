//! Index and performance tools: index inventory, sizes and query plans.

use crate::error::BridgeError;
use crate::mcp::registry::{handler, ToolRegistry};
use crate::mcp::schema::ToolDescriptor;
use crate::resolver::ResolveConnection;
use crate::tools::args::{enum_arg, optional_bool, quote_literal, require_str, split_table_name};
use crate::tools::pretty;
use serde_json::json;
use std::sync::Arc;

pub fn register(registry: &ToolRegistry, resolver: &Arc<dyn ResolveConnection>) {
    register_get_table_indexes(registry, Arc::clone(resolver));
    register_get_table_size(registry, Arc::clone(resolver));
    register_explain_query(registry, Arc::clone(resolver));
}

fn cell_bool(cell: Option<&str>) -> bool {
    matches!(cell, Some("true") | Some("t"))
}

fn register_get_table_indexes(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_indexes",
        "List the indexes of a table with type, uniqueness and size.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)")
    .optional_bool("include_definition", "Include each CREATE INDEX statement", true);
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let include_definition = optional_bool(&args, "include_definition", true);
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let sql = format!(
                    "SELECT c.relname AS name, am.amname AS index_type, \
                            ix.indisunique AS is_unique, ix.indisprimary AS is_primary, \
                            pg_size_pretty(pg_relation_size(c.oid)) AS size, \
                            pg_get_indexdef(ix.indexrelid) AS definition \
                     FROM pg_index ix \
                     JOIN pg_class c ON c.oid = ix.indexrelid \
                     JOIN pg_class t ON t.oid = ix.indrelid \
                     JOIN pg_namespace n ON n.oid = t.relnamespace \
                     JOIN pg_am am ON am.oid = c.relam \
                     WHERE n.nspname = {} AND t.relname = {} \
                     ORDER BY c.relname",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                let result = db.execute_query(&token, &sql).await?;

                let mut indexes = Vec::new();
                for row in &result.rows {
                    let mut entry = json!({
                        "name": result.cell(row, "name"),
                        "type": result.cell(row, "index_type"),
                        "unique": cell_bool(result.cell(row, "is_unique")),
                        "primary": cell_bool(result.cell(row, "is_primary")),
                        "size": result.cell(row, "size"),
                    });
                    if include_definition {
                        entry["definition"] = json!(result.cell(row, "definition"));
                    }
                    indexes.push(entry);
                }
                pretty(&json!({
                    "table": table,
                    "schema": schema,
                    "indexes": indexes,
                }))
            }
        }),
    );
}

fn register_get_table_size(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_size",
        "Get the on-disk footprint of a table: total, heap and index sizes plus the row estimate.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)")
    .optional_bool("include_indexes", "Break out per-index sizes", true);
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let include_indexes = optional_bool(&args, "include_indexes", true);
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let sql = format!(
                    "SELECT pg_size_pretty(pg_total_relation_size(c.oid)) AS total_size, \
                            pg_size_pretty(pg_relation_size(c.oid)) AS table_size, \
                            pg_size_pretty(pg_indexes_size(c.oid)) AS indexes_size, \
                            c.reltuples::bigint AS row_count \
                     FROM pg_class c \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     WHERE n.nspname = {} AND c.relname = {}",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                let result = db.execute_query(&token, &sql).await?;
                let row = result.rows.first().ok_or_else(|| {
                    BridgeError::database(format!("table '{schema}.{table}' not found"), None)
                })?;

                let index_sql = format!(
                    "SELECT c.relname AS name, \
                            pg_size_pretty(pg_relation_size(c.oid)) AS size \
                     FROM pg_index ix \
                     JOIN pg_class c ON c.oid = ix.indexrelid \
                     JOIN pg_class t ON t.oid = ix.indrelid \
                     JOIN pg_namespace n ON n.oid = t.relnamespace \
                     WHERE n.nspname = {} AND t.relname = {} \
                     ORDER BY c.relname",
                    quote_literal(&schema),
                    quote_literal(&table),
                );

                let mut payload = json!({
                    "table": table,
                    "schema": schema,
                    "total_size": result.cell(row, "total_size"),
                    "table_size": result.cell(row, "table_size"),
                    "indexes_size": result.cell(row, "indexes_size"),
                    "row_count": result.cell(row, "row_count"),
                });

                if include_indexes {
                    let indexes = db.execute_query(&token, &index_sql).await?;
                    payload["indexes"] = json!(indexes.objects());
                }
                pretty(&payload)
            }
        }),
    );
}

fn register_explain_query(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "explain_query",
        "Show the execution plan of a SELECT query. Only SELECT statements are accepted.",
    )
    .required_string("query", "The SELECT statement to explain")
    .optional_bool("analyze", "Actually execute the query (EXPLAIN ANALYZE)", false)
    .enum_string("format", "Plan output format", &["text", "json"], "text");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let query = require_str(&args, "query")?;
                let analyze = optional_bool(&args, "analyze", false);
                let format = enum_arg(&args, "format", &["text", "json"], "text")?;

                // Refuse before touching the database.
                if !query.trim().to_uppercase().starts_with("SELECT") {
                    return Err(BridgeError::refused("only SELECT queries are allowed"));
                }

                let prefix = match (analyze, format.as_str()) {
                    (true, "json") => "EXPLAIN (ANALYZE, FORMAT JSON)",
                    (true, _) => "EXPLAIN ANALYZE",
                    (false, "json") => "EXPLAIN (FORMAT JSON)",
                    (false, _) => "EXPLAIN",
                };

                let db = resolver.resolve().await?;
                let result = db.execute_query(&token, &format!("{prefix} {query}")).await?;
                let plan = result
                    .rows
                    .iter()
                    .filter_map(|row| row.first().and_then(|cell| cell.as_deref()))
                    .collect::<Vec<_>>()
                    .join("\n");

                pretty(&json!({
                    "query": query,
                    "analyze": analyze,
                    "format": format,
                    "plan": plan,
                }))
            }
        }),
    );
}
