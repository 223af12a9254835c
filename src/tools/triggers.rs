//! Trigger tools: inventory and definitions.

use crate::error::BridgeError;
use crate::mcp::registry::{handler, ToolRegistry};
use crate::mcp::schema::ToolDescriptor;
use crate::resolver::ResolveConnection;
use crate::tools::args::{quote_literal, require_str, split_table_name};
use crate::tools::pretty;
use serde_json::json;
use std::sync::Arc;

pub fn register(registry: &ToolRegistry, resolver: &Arc<dyn ResolveConnection>) {
    register_get_table_triggers(registry, Arc::clone(resolver));
    register_get_trigger_definition(registry, Arc::clone(resolver));
}

fn register_get_table_triggers(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_table_triggers",
        "List the triggers of a table with event, timing, orientation and action.",
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
                    "SELECT trigger_name AS name, event_manipulation AS event, \
                            action_timing AS timing, action_orientation AS orientation, \
                            action_statement AS statement \
                     FROM information_schema.triggers \
                     WHERE event_object_schema = {} AND event_object_table = {} \
                     ORDER BY trigger_name, event_manipulation",
                    quote_literal(&schema),
                    quote_literal(&table),
                );
                let result = db.execute_query(&token, &sql).await?;
                pretty(&json!({
                    "table": table,
                    "schema": schema,
                    "triggers": result.objects(),
                }))
            }
        }),
    );
}

fn register_get_trigger_definition(registry: &ToolRegistry, resolver: Arc<dyn ResolveConnection>) {
    let descriptor = ToolDescriptor::new(
        "get_trigger_definition",
        "Get the printable definition of a trigger plus the source of its trigger function.",
    )
    .required_string("trigger_name", "Trigger name")
    .required_string("table_name", "Table the trigger is attached to (schema.table)");
    registry.register(
        descriptor,
        handler(move |token, args| {
            let resolver = Arc::clone(&resolver);
            async move {
                let trigger = require_str(&args, "trigger_name")?;
                let raw = require_str(&args, "table_name")?;
                let (schema, table) = split_table_name(&raw);

                let db = resolver.resolve().await?;
                let sql = format!(
                    "SELECT pg_get_triggerdef(t.oid) AS definition, \
                            p.proname AS function_name, p.prosrc AS function_source \
                     FROM pg_trigger t \
                     JOIN pg_class c ON c.oid = t.tgrelid \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     JOIN pg_proc p ON p.oid = t.tgfoid \
                     WHERE n.nspname = {} AND c.relname = {} AND t.tgname = {} \
                     AND NOT t.tgisinternal",
                    quote_literal(&schema),
                    quote_literal(&table),
                    quote_literal(&trigger),
                );
                let result = db.execute_query(&token, &sql).await?;
                let row = result.rows.first().ok_or_else(|| {
                    BridgeError::database(
                        format!("trigger '{trigger}' not found on '{schema}.{table}'"),
                        None,
                    )
                })?;

                pretty(&json!({
                    "trigger": trigger,
                    "table": table,
                    "schema": schema,
                    "definition": result.cell(row, "definition"),
                    "function_name": result.cell(row, "function_name"),
                    "function_source": result.cell(row, "function_source"),
                }))
            }
        }),
    );
}
