//! Discovery tools: sequences, materialized views and reference maps.

use crate::mcp::registry::{handler, ToolRegistry};
use crate::mcp::schema::ToolDescriptor;
use crate::resolver::ResolveConnection;
use crate::tools::args::{optional_str, quote_literal, require_str, split_table_name};
use crate::tools::pretty;
use serde_json::json;
use std::sync::Arc;

pub fn register(registry: &ToolRegistry, resolver: &Arc<dyn ResolveConnection>) {
    register_list_sequences(registry, Arc::clone(resolver));
    register_list_materialized_views(registry, Arc::clone(resolver));
    register_get_table_references(registry, Arc::clone(resolver));
}

fn register_list_sequences(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "list_sequences",
        "List sequences with their type, bounds, increment and cycle flag.",
    )
    .optional_string("schema", "Restrict to one schema");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let schema = optional_str(&args, "schema");

                let db = resolver.resolve().await?;
                let mut sql = String::from(
                    "SELECT sequence_schema AS schema, sequence_name AS name, \
                            data_type, start_value, minimum_value, maximum_value, \
                            increment, cycle_option AS cycles \
                     FROM information_schema.sequences \
                     WHERE sequence_schema NOT IN ('pg_catalog', 'information_schema')",
                );
                if let Some(schema) = &schema {
                    sql.push_str(&format!(" AND sequence_schema = {}", quote_literal(schema)));
                }
                sql.push_str(" ORDER BY sequence_schema, sequence_name");

                let result = db.execute_query(&token, &sql).await?;
                pretty(&json!({ "sequences": result.objects() }))
            }
        }),
    );
}

fn register_list_materialized_views(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "list_materialized_views",
        "List materialized views with their size and defining query. System schemas are omitted.",
    )
    .optional_string("schema", "Restrict to one schema");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let schema = optional_str(&args, "schema");

                let db = resolver.resolve().await?;
                let mut sql = String::from(
                    "SELECT n.nspname AS schema, c.relname AS name, \
                            pg_size_pretty(pg_total_relation_size(c.oid)) AS size, \
                            pg_get_viewdef(c.oid, true) AS definition \
                     FROM pg_class c \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     WHERE c.relkind = 'm' \
                     AND n.nspname NOT IN ('pg_catalog', 'information_schema') \
                     AND n.nspname NOT LIKE 'pg_toast%' \
                     AND n.nspname NOT LIKE 'pg_temp%'",
                );
                if let Some(schema) = &schema {
                    sql.push_str(&format!(" AND n.nspname = {}", quote_literal(schema)));
                }
                sql.push_str(" ORDER BY n.nspname, c.relname");

                let result = db.execute_query(&token, &sql).await?;
                pretty(&json!({ "materialized_views": result.objects() }))
            }
        }),
    );
}

fn register_get_table_references(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_references",
        "Compact reference map of a table: which tables it references and which reference it.",
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
                let references_sql = format!(
                    "SELECT DISTINCT ccu.table_schema || '.' || ccu.table_name AS name \
                     FROM information_schema.table_constraints tc \
                     JOIN information_schema.constraint_column_usage ccu \
                         ON ccu.constraint_name = tc.constraint_name \
                         AND ccu.table_schema = tc.table_schema \
                     WHERE tc.constraint_type = 'FOREIGN KEY' \
                     AND tc.table_schema = {} AND tc.table_name = {} \
                     ORDER BY name",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                let referenced_by_sql = format!(
                    "SELECT DISTINCT tc.table_schema || '.' || tc.table_name AS name \
                     FROM information_schema.table_constraints tc \
                     JOIN information_schema.constraint_column_usage ccu \
                         ON ccu.constraint_name = tc.constraint_name \
                         AND ccu.table_schema = tc.table_schema \
                     WHERE tc.constraint_type = 'FOREIGN KEY' \
                     AND ccu.table_schema = {} AND ccu.table_name = {} \
                     ORDER BY name",
                    quote_literal(&schema),
                    quote_literal(&table),
                );

                let references: Vec<String> = db
                    .execute_query(&token, &references_sql)
                    .await?
                    .rows
                    .iter()
                    .filter_map(|row| row.first().and_then(|c| c.clone()))
                    .collect();
                let referenced_by: Vec<String> = db
                    .execute_query(&token, &referenced_by_sql)
                    .await?
                    .rows
                    .iter()
                    .filter_map(|row| row.first().and_then(|c| c.clone()))
                    .collect();

                let referenced_by_count = referenced_by.len();
                let references_count = references.len();
                pretty(&json!({
                    "table": table,
                    "schema": schema,
                    "referenced_by": referenced_by,
                    "referenced_by_count": referenced_by_count,
                    "references": references,
                    "references_count": references_count,
                }))
            }
        }),
    );
}
