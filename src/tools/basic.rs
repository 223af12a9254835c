//! Basic introspection tools: listing, schema, search, sampling, counting.

use crate::error::BridgeError;
use crate::mcp::registry::{handler, ToolRegistry};
use crate::mcp::schema::ToolDescriptor;
use crate::resolver::ResolveConnection;
use crate::tools::args::{
    optional_bool, optional_i64, optional_str, pattern_matches, qualified_name, quote_literal,
    require_str, split_table_name,
};
use crate::tools::pretty;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Default row count for `get_sample_data`.
const DEFAULT_SAMPLE_LIMIT: i64 = 5;

/// Hard cap on sampled rows, regardless of the requested limit.
const MAX_SAMPLE_LIMIT: i64 = 10;

pub fn register(registry: &ToolRegistry, resolver: &Arc<dyn ResolveConnection>) {
    register_list_all_tables(registry, Arc::clone(resolver));
    register_get_table_schema(registry, Arc::clone(resolver));
    register_search_tables(registry, Arc::clone(resolver));
    register_get_sample_data(registry, Arc::clone(resolver));
    register_get_table_count(registry, Arc::clone(resolver));
}

fn register_list_all_tables(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "list_all_tables",
        "List all user tables grouped by schema. System schemas and schemas without tables are omitted.",
    );
    registry.register(
        descriptor,
        handler(move |_token, _args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let db = resolver.resolve().await?;
                let mut grouped = Map::new();
                for schema in db.list_schemas().await? {
                    let tables = db.list_tables(&schema).await?;
                    if tables.is_empty() {
                        continue;
                    }
                    grouped.insert(schema, json!(tables));
                }
                pretty(&Value::Object(grouped))
            }
        }),
    );
}

fn register_get_table_schema(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_schema",
        "Get the column definitions of a table, optionally with its constraints.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)")
    .optional_bool("include_constraints", "Include table constraints", true);
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let include_constraints = optional_bool(&args, "include_constraints", true);
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let columns = db.table_columns(&schema, &table).await?;
                if columns.is_empty() {
                    return Err(BridgeError::database(
                        format!("table '{schema}.{table}' not found"),
                        None,
                    ));
                }

                let sql = format!(
                    "SELECT con.conname AS name, pg_get_constraintdef(con.oid) AS definition \
                     FROM pg_constraint con \
                     JOIN pg_class c ON c.oid = con.conrelid \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     WHERE n.nspname = {} AND c.relname = {} \
                     ORDER BY con.conname",
                    quote_literal(&schema),
                    quote_literal(&table),
                );

                let mut payload = json!({
                    "table": table,
                    "schema": schema,
                    "columns": columns,
                    "include_constraints": include_constraints,
                });
                if include_constraints {
                    let constraints = db.execute_query(&token, &sql).await?;
                    payload["constraints"] = json!(constraints.objects());
                }
                pretty(&payload)
            }
        }),
    );
}

fn register_search_tables(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "search_tables",
        "Find tables whose name matches a LIKE-style pattern (%x%, %x, x% or exact, case-insensitive).",
    )
    .required_string("pattern", "Pattern to match against table names")
    .optional_string("schema", "Restrict the search to one schema");
    registry.register(
        descriptor,
        handler(move |_token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let pattern = require_str(&args, "pattern")?;
                let schema_filter = optional_str(&args, "schema");

                let db = resolver.resolve().await?;
                let mut matches = Vec::new();
                for schema in db.list_schemas().await? {
                    if let Some(filter) = &schema_filter {
                        if &schema != filter {
                            continue;
                        }
                    }
                    for table in db.list_tables(&schema).await? {
                        if pattern_matches(&pattern, &table) {
                            matches.push(format!("{schema}.{table}"));
                        }
                    }
                }
                pretty(&matches)
            }
        }),
    );
}

fn register_get_sample_data(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_sample_data",
        "Fetch a few rows from a table to show the shape of its data.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)")
    .optional_integer("limit", "Number of rows to fetch (1-10)", DEFAULT_SAMPLE_LIMIT);
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let limit = optional_i64(&args, "limit", DEFAULT_SAMPLE_LIMIT)
                    .clamp(1, MAX_SAMPLE_LIMIT);
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let sql = format!(
                    "SELECT * FROM {} LIMIT {limit}",
                    qualified_name(&schema, &table)
                );
                let result = db.execute_query(&token, &sql).await?;
                pretty(&result.objects())
            }
        }),
    );
}

fn register_get_table_count(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new("get_table_count", "Count the rows of a table.")
        .required_string("table_name", "Table name, optionally schema-qualified (schema.table)");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let sql = format!("SELECT COUNT(*) FROM {}", qualified_name(&schema, &table));
                let result = db.execute_query(&token, &sql).await?;
                let count = result.first_cell().unwrap_or("0").to_string();
                pretty(&json!({
                    "table": table,
                    "schema": schema,
                    "count": count,
                }))
            }
        }),
    );
}
