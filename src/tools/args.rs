//! Shared argument handling for tool handlers.
//!
//! The argument bag is an untyped JSON object; handlers extract, coerce and
//! default from it here. Table names follow the `schema.table` convention
//! (bare names resolve to `public`), and search patterns use a simplified
//! LIKE dialect that only understands `%`-anchored forms.

use crate::error::{BridgeError, BridgeResult};
use crate::mcp::registry::ToolArguments;
use serde_json::Value;

/// Extract a required, non-empty string argument.
pub fn require_str(args: &ToolArguments, name: &str) -> BridgeResult<String> {
    match args.get(name).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(BridgeError::missing_argument(name)),
    }
}

/// Extract an optional string argument; empty strings count as absent.
pub fn optional_str(args: &ToolArguments, name: &str) -> Option<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Extract an optional boolean argument.
pub fn optional_bool(args: &ToolArguments, name: &str, default: bool) -> bool {
    args.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Extract an optional integer argument. JSON numbers arriving as floats are
/// floored to an integer.
pub fn optional_i64(args: &ToolArguments, name: &str, default: i64) -> i64 {
    match args.get(name) {
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.floor() as i64))
            .unwrap_or(default),
        None => default,
    }
}

/// Extract an enum-constrained string argument, falling back to the default
/// when absent and rejecting values outside the allowed set.
pub fn enum_arg(
    args: &ToolArguments,
    name: &str,
    allowed: &[&str],
    default: &str,
) -> BridgeResult<String> {
    let value = optional_str(args, name).unwrap_or_else(|| default.to_string());
    let lowered = value.to_lowercase();
    if allowed.contains(&lowered.as_str()) {
        Ok(lowered)
    } else {
        Err(BridgeError::invalid_argument(format!(
            "{name} must be one of: {}",
            allowed.join(", ")
        )))
    }
}

/// Split a `schema.table` argument on the first dot; a bare name resolves to
/// the `public` schema.
pub fn split_table_name(raw: &str) -> (String, String) {
    match raw.split_once('.') {
        Some((schema, table)) => (schema.to_string(), table.to_string()),
        None => ("public".to_string(), raw.to_string()),
    }
}

/// Quote an identifier for interpolation into SQL, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal for interpolation into SQL.
pub fn quote_literal(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

/// The qualified, quoted form of a (schema, table) pair.
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Case-insensitive match against a simplified LIKE pattern: `%x%`, `%x`,
/// `x%` or an exact value.
pub fn pattern_matches(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let candidate = candidate.to_lowercase();

    match (pattern.strip_prefix('%'), pattern.strip_suffix('%')) {
        (Some(_), Some(_)) => {
            let needle = pattern.trim_matches('%');
            needle.is_empty() || candidate.contains(needle)
        }
        (Some(suffix), None) => candidate.ends_with(suffix),
        (None, Some(prefix)) => candidate.starts_with(prefix),
        (None, None) => candidate == pattern,
    }
}
