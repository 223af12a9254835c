//! Relationship and constraint tools: foreign keys, constraints, dependents.

use crate::mcp::registry::{handler, ToolRegistry};
use crate::mcp::schema::ToolDescriptor;
use crate::resolver::ResolveConnection;
use crate::tools::args::{enum_arg, quote_literal, require_str, split_table_name};
use crate::tools::pretty;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn register(registry: &ToolRegistry, resolver: &Arc<dyn ResolveConnection>) {
    register_get_foreign_keys(registry, Arc::clone(resolver));
    register_get_table_constraints(registry, Arc::clone(resolver));
    register_get_table_dependencies(registry, Arc::clone(resolver));
}

fn outgoing_fk_sql(schema: &str, table: &str) -> String {
    format!(
        "SELECT tc.constraint_name, kcu.column_name, \
                ccu.table_schema AS referenced_schema, ccu.table_name AS referenced_table, \
                ccu.column_name AS referenced_column \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
             ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         JOIN information_schema.constraint_column_usage ccu \
             ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema \
         WHERE tc.constraint_type = 'FOREIGN KEY' \
         AND tc.table_schema = {} AND tc.table_name = {} \
         ORDER BY tc.constraint_name",
        quote_literal(schema),
        quote_literal(table),
    )
}

fn incoming_fk_sql(schema: &str, table: &str) -> String {
    format!(
        "SELECT tc.constraint_name, \
                tc.table_schema AS referencing_schema, tc.table_name AS referencing_table, \
                kcu.column_name, ccu.column_name AS referenced_column \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
             ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         JOIN information_schema.constraint_column_usage ccu \
             ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema \
         WHERE tc.constraint_type = 'FOREIGN KEY' \
         AND ccu.table_schema = {} AND ccu.table_name = {} \
         ORDER BY tc.constraint_name",
        quote_literal(schema),
        quote_literal(table),
    )
}

fn register_get_foreign_keys(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_foreign_keys",
        "List foreign key edges of a table: outgoing (this table references), incoming (referenced by), or both.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)")
    .enum_string("direction", "Which edges to list", &["outgoing", "incoming", "both"], "both");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let direction =
                    enum_arg(&args, "direction", &["outgoing", "incoming", "both"], "both")?;
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let mut outgoing: Vec<Value> = Vec::new();
                let mut incoming: Vec<Value> = Vec::new();

                if direction == "outgoing" || direction == "both" {
                    let result = db
                        .execute_query(&token, &outgoing_fk_sql(&schema, &table))
                        .await?;
                    for row in &result.rows {
                        outgoing.push(json!({
                            "constraint": result.cell(row, "constraint_name"),
                            "column": result.cell(row, "column_name"),
                            "referenced_table": format!(
                                "{}.{}",
                                result.cell(row, "referenced_schema").unwrap_or_default(),
                                result.cell(row, "referenced_table").unwrap_or_default(),
                            ),
                            "referenced_column": result.cell(row, "referenced_column"),
                        }));
                    }
                }
                if direction == "incoming" || direction == "both" {
                    let result = db
                        .execute_query(&token, &incoming_fk_sql(&schema, &table))
                        .await?;
                    for row in &result.rows {
                        incoming.push(json!({
                            "constraint": result.cell(row, "constraint_name"),
                            "table": format!(
                                "{}.{}",
                                result.cell(row, "referencing_schema").unwrap_or_default(),
                                result.cell(row, "referencing_table").unwrap_or_default(),
                            ),
                            "column": result.cell(row, "column_name"),
                            "referenced_column": result.cell(row, "referenced_column"),
                        }));
                    }
                }

                pretty(&json!({
                    "table": table,
                    "schema": schema,
                    "direction": direction,
                    "outgoing": outgoing,
                    "incoming": incoming,
                }))
            }
        }),
    );
}

fn constraint_type_name(contype: &str) -> &'static str {
    match contype {
        "p" => "PRIMARY KEY",
        "f" => "FOREIGN KEY",
        "u" => "UNIQUE",
        "c" => "CHECK",
        "x" => "EXCLUDE",
        _ => "OTHER",
    }
}

fn register_get_table_constraints(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_constraints",
        "List the constraints of a table with their printable definitions.",
    )
    .required_string("table_name", "Table name, optionally schema-qualified (schema.table)")
    .enum_string(
        "constraint_type",
        "Restrict to one constraint kind",
        &["all", "primary", "foreign", "unique", "check", "exclude"],
        "all",
    );
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let raw = require_str(&args, "table_name")?;
                let wanted = enum_arg(
                    &args,
                    "constraint_type",
                    &["all", "primary", "foreign", "unique", "check", "exclude"],
                    "all",
                )?;
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let sql = format!(
                    "SELECT con.conname AS name, con.contype::text AS contype, \
                            pg_get_constraintdef(con.oid) AS definition \
                     FROM pg_constraint con \
                     JOIN pg_class c ON c.oid = con.conrelid \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     WHERE n.nspname = {} AND c.relname = {} \
                     ORDER BY con.conname",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                let result = db.execute_query(&token, &sql).await?;

                let mut constraints = Vec::new();
                for row in &result.rows {
                    let contype = result.cell(row, "contype").unwrap_or_default();
                    let type_name = constraint_type_name(contype);
                    let keep = match wanted.as_str() {
                        "all" => true,
                        "primary" => contype == "p",
                        "foreign" => contype == "f",
                        "unique" => contype == "u",
                        "check" => contype == "c",
                        "exclude" => contype == "x",
                        _ => true,
                    };
                    if !keep {
                        continue;
                    }
                    constraints.push(json!({
                        "name": result.cell(row, "name"),
                        "type": type_name,
                        "definition": result.cell(row, "definition"),
                    }));
                }

                pretty(&json!({
                    "table": table,
                    "schema": schema,
                    "constraints": constraints,
                }))
            }
        }),
    );
}

fn register_get_table_dependencies(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_dependencies",
        "Find views, materialized views and foreign tables whose definitions reference a table.",
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
                    "SELECT DISTINCT n.nspname AS schema, c.relname AS name, \
                            CASE c.relkind \
                                WHEN 'v' THEN 'view' \
                                WHEN 'm' THEN 'materialized view' \
                                WHEN 'f' THEN 'foreign table' \
                                ELSE c.relkind::text \
                            END AS kind \
                     FROM pg_depend d \
                     JOIN pg_rewrite r ON r.oid = d.objid \
                     JOIN pg_class c ON c.oid = r.ev_class \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     JOIN pg_class src ON src.oid = d.refobjid \
                     JOIN pg_namespace srcn ON srcn.oid = src.relnamespace \
                     WHERE srcn.nspname = {} AND src.relname = {} AND c.oid <> src.oid \
                     ORDER BY 1, 2",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                let result = db.execute_query(&token, &sql).await?;
                pretty(&json!({
                    "table": table,
                    "schema": schema,
                    "dependencies": result.objects(),
                }))
            }
        }),
    );
}
