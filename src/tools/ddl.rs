//! DDL reconstruction tools: tables, views and functions.

use crate::error::BridgeError;
use crate::mcp::registry::{handler, ToolRegistry};
use crate::mcp::schema::ToolDescriptor;
use crate::resolver::ResolveConnection;
use crate::tools::args::{
    optional_bool, optional_str, qualified_name, quote_ident, quote_literal, require_str,
    split_table_name,
};
use crate::tools::pretty;
use serde_json::json;
use std::sync::Arc;

pub fn register(registry: &ToolRegistry, resolver: &Arc<dyn ResolveConnection>) {
    register_get_table_ddl(registry, Arc::clone(resolver));
    register_get_view_definition(registry, Arc::clone(resolver));
    register_get_function_definition(registry, Arc::clone(resolver));
}

fn register_get_table_ddl(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_ddl",
        "Reconstruct the CREATE TABLE statement for a table, optionally with its secondary indexes.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)")
    .optional_bool("include_indexes", "Append CREATE INDEX statements", true);
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let include_indexes = optional_bool(&args, "include_indexes", true);
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let columns = db.table_columns(&schema, &table).await?;
                if columns.is_empty() {
                    return Err(BridgeError::database(
                        format!("table '{schema}.{table}' not found"),
                        None,
                    ));
                }

                let constraint_sql = format!(
                    "SELECT con.conname AS name, pg_get_constraintdef(con.oid) AS definition \
                     FROM pg_constraint con \
                     JOIN pg_class c ON c.oid = con.conrelid \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     WHERE n.nspname = {} AND c.relname = {} \
                     ORDER BY con.conname",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                let constraints = db.execute_query(&token, &constraint_sql).await?;

                let mut lines: Vec<String> = columns
                    .iter()
                    .map(|col| {
                        let mut line = format!("    {} {}", quote_ident(&col.name), col.data_type);
                        if let Some(default) = &col.default {
                            line.push_str(&format!(" DEFAULT {default}"));
                        }
                        if !col.nullable {
                            line.push_str(" NOT NULL");
                        }
                        line
                    })
                    .collect();

                let mut constraint_names = Vec::new();
                for row in &constraints.rows {
                    let name = constraints.cell(row, "name").unwrap_or_default();
                    let definition = constraints.cell(row, "definition").unwrap_or_default();
                    constraint_names.push(name.to_string());
                    lines.push(format!("    CONSTRAINT {} {definition}", quote_ident(name)));
                }

                let mut ddl = format!(
                    "CREATE TABLE {} (\n{}\n);",
                    qualified_name(&schema, &table),
                    lines.join(",\n")
                );

                if include_indexes {
                    let index_sql = format!(
                        "SELECT indexname, indexdef FROM pg_indexes \
                         WHERE schemaname = {} AND tablename = {} \
                         ORDER BY indexname",
                        quote_literal(&schema),
                        quote_literal(&table),
                    );
                    let indexes = db.execute_query(&token, &index_sql).await?;
                    for row in &indexes.rows {
                        let name = indexes.cell(row, "indexname").unwrap_or_default();
                        // Indexes backing primary key / unique constraints are
                        // already covered by the constraint lines above.
                        if constraint_names.iter().any(|c| c.as_str() == name) {
                            continue;
                        }
                        if let Some(definition) = indexes.cell(row, "indexdef") {
                            ddl.push_str(&format!("\n\n{definition};"));
                        }
                    }
                }

                Ok(ddl)
            }
        }),
    );
}

fn register_get_view_definition(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_view_definition",
        "Get the defining SELECT statement of a view or materialized view.",
    )
    .required_string("view_name", "View name, optionally schema-qualified (schema.view)");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "view_name")?;
                let (schema, view) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let sql = format!(
                    "SELECT pg_get_viewdef(c.oid, true) AS definition \
                     FROM pg_class c \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     WHERE n.nspname = {} AND c.relname = {} AND c.relkind IN ('v', 'm')",
                    quote_literal(&schema),
                    quote_literal(&view),
                );
                let result = db.execute_query(&token, &sql).await?;
                let definition = result.first_cell().ok_or_else(|| {
                    BridgeError::database(format!("view '{schema}.{view}' not found"), None)
                })?;
                pretty(&json!({
                    "view": view,
                    "schema": schema,
                    "definition": definition,
                }))
            }
        }),
    );
}

fn register_get_function_definition(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_function_definition",
        "Get the signature, return type and full source of a function. Overloads are all returned.",
    )
    .required_string("function_name", "Function name without arguments")
    .optional_string_default("schema", "Schema the function lives in", "public");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let name = require_str(&args, "function_name")?;
                let schema = optional_str(&args, "schema").unwrap_or_else(|| "public".to_string());

                let db = resolver.resolve().await?;
                let sql = format!(
                    "SELECT p.proname AS name, \
                            pg_get_function_arguments(p.oid) AS arguments, \
                            pg_get_function_result(p.oid) AS return_type, \
                            pg_get_functiondef(p.oid) AS definition \
                     FROM pg_proc p \
                     JOIN pg_namespace n ON n.oid = p.pronamespace \
                     WHERE n.nspname = {} AND p.proname = {} \
                     ORDER BY p.oid",
                    quote_literal(&schema),
                    quote_literal(&name),
                );
                let result = db.execute_query(&token, &sql).await?;
                if result.rows.is_empty() {
                    return Err(BridgeError::database(
                        format!("function '{schema}.{name}' not found"),
                        None,
                    ));
                }
                pretty(&json!({
                    "function": name,
                    "schema": schema,
                    "definitions": result.objects(),
                }))
            }
        }),
    );
}
