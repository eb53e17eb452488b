use chrono::SecondsFormat;
use serde_json::{Map, Value as JsonValue, json};

use crate::client::Mutation;
use crate::types::RowValues;

/// Encode a value the way the REST API expects it in `values` lists.
///
/// 64-bit integers travel as strings so they survive JSON number precision; non-finite
/// floats use the API's spelled-out names.
#[must_use]
pub fn encode_value(value: &RowValues) -> JsonValue {
    match value {
        RowValues::Int(v) => JsonValue::String(v.to_string()),
        RowValues::Float(v) if v.is_nan() => JsonValue::String("NaN".to_string()),
        RowValues::Float(v) if v.is_infinite() => JsonValue::String(
            if v.is_sign_positive() {
                "Infinity"
            } else {
                "-Infinity"
            }
            .to_string(),
        ),
        RowValues::Float(v) => json!(v),
        RowValues::Numeric(v) | RowValues::Text(v) | RowValues::Bytes(v) => {
            JsonValue::String(v.clone())
        }
        RowValues::Bool(v) => JsonValue::Bool(*v),
        RowValues::Timestamp(v) => {
            JsonValue::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        RowValues::Date(v) => JsonValue::String(v.format("%Y-%m-%d").to_string()),
        RowValues::Json(v) => JsonValue::String(v.to_string()),
        RowValues::Array(items) => JsonValue::Array(items.iter().map(encode_value).collect()),
        RowValues::Null => JsonValue::Null,
    }
}

/// Encode one mutation as a REST `Mutation` object with a single row of values.
#[must_use]
pub fn encode_mutation(mutation: &Mutation) -> JsonValue {
    let (op, table, row) = match mutation {
        Mutation::Insert { table, row } => ("insert", table, row),
        Mutation::Update { table, row } => ("update", table, row),
    };
    let values: Vec<JsonValue> = row.values().iter().map(encode_value).collect();
    let mut wrapper = Map::with_capacity(1);
    wrapper.insert(
        op.to_string(),
        json!({
            "table": table,
            "columns": row.columns(),
            "values": [values],
        }),
    );
    JsonValue::Object(wrapper)
}
