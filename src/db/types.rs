//! Stringification of PostgreSQL values.
//!
//! The generic read-query executor returns text cells. Decoding goes through
//! a typed ladder keyed on the column's declared type so numbers, booleans
//! and timestamps render the way psql would; anything unrecognized falls back
//! to a plain string decode.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;

/// Decode one cell of a row to its text form. `None` marks SQL NULL.
pub fn decode_cell(row: &PgRow, idx: usize) -> Option<String> {
    let type_name = row.columns()[idx].type_info().name().to_uppercase();

    match type_name.as_str() {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(|v| v.to_string()),
        "INT2" => decode_display::<i16>(row, idx),
        "INT4" => decode_display::<i32>(row, idx),
        "INT8" => decode_display::<i64>(row, idx),
        "OID" => row
            .try_get::<Option<sqlx::postgres::types::Oid>, _>(idx)
            .ok()
            .flatten()
            .map(|v| v.0.to_string()),
        "FLOAT4" => decode_display::<f32>(row, idx),
        "FLOAT8" => decode_display::<f64>(row, idx),
        "UUID" => row
            .try_get::<Option<sqlx::types::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|v| v.to_string()),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| v.to_rfc3339()),
        "TIMESTAMP" => decode_display::<NaiveDateTime>(row, idx),
        "DATE" => decode_display::<NaiveDate>(row, idx),
        "TIME" => decode_display::<NaiveTime>(row, idx),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .map(|v| v.to_string()),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|bytes| {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                format!("\\x{hex}")
            }),
        "TEXT[]" | "VARCHAR[]" | "NAME[]" => row
            .try_get::<Option<Vec<String>>, _>(idx)
            .ok()
            .flatten()
            .map(|items| format!("{{{}}}", items.join(","))),
        _ => decode_text(row, idx, &type_name),
    }
}

fn decode_display<'r, T>(row: &'r PgRow, idx: usize) -> Option<String>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + std::fmt::Display,
{
    row.try_get::<Option<T>, _>(idx)
        .ok()
        .flatten()
        .map(|v| v.to_string())
}

/// Catch-all: text-like types decode directly; everything else is attempted
/// as a string and surfaces as NULL on failure rather than aborting the row.
fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> Option<String> {
    match row.try_get::<Option<String>, _>(idx) {
        Ok(value) => value,
        Err(e) => {
            debug!(column_type = %type_name, error = %e, "Could not stringify column value");
            None
        }
    }
}
