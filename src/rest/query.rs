use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::SpannerDbError;
use crate::results::QueryResult;
use crate::types::{CommitTimestamp, RowValues};

/// REST `ResultSet`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultSetJson {
    pub metadata: Option<ResultSetMetadata>,
    pub rows: Vec<Vec<JsonValue>>,
    pub stats: Option<ResultSetStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultSetMetadata {
    pub row_type: Option<StructType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StructType {
    pub fields: Vec<Field>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeJson,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeJson {
    pub code: String,
    pub array_element_type: Option<Box<TypeJson>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultSetStats {
    /// int64 encoded as a string
    pub row_count_exact: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommitResponse {
    pub(crate) commit_timestamp: String,
}

impl CommitResponse {
    pub(crate) fn timestamp(&self) -> Result<CommitTimestamp, SpannerDbError> {
        DateTime::parse_from_rfc3339(&self.commit_timestamp)
            .map(|dt| CommitTimestamp(dt.with_timezone(&Utc)))
            .map_err(|e| {
                SpannerDbError::TransactionError(format!(
                    "unreadable commit timestamp `{}`: {e}",
                    self.commit_timestamp
                ))
            })
    }
}

impl ResultSetJson {
    /// Exact DML row count from the stats block.
    ///
    /// # Errors
    /// Returns `SpannerDbError::QueryError` if the count is present but not an integer.
    pub fn row_count_exact(&self) -> Result<Option<i64>, SpannerDbError> {
        self.stats
            .as_ref()
            .and_then(|s| s.row_count_exact.as_deref())
            .map(|count| {
                count.parse::<i64>().map_err(|e| {
                    SpannerDbError::QueryError(format!("bad rowCountExact `{count}`: {e}"))
                })
            })
            .transpose()
    }
}

/// Build a result handle from a REST `ResultSet`.
///
/// # Errors
/// Returns `SpannerDbError::QueryError` if a value does not match its declared column type.
pub fn build_query_result(result_set: ResultSetJson) -> Result<QueryResult, SpannerDbError> {
    let rows_affected = result_set.row_count_exact()?;
    let fields = result_set
        .metadata
        .and_then(|m| m.row_type)
        .map(|t| t.fields)
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(result_set.rows.len());
    for raw in result_set.rows {
        if raw.len() != fields.len() {
            return Err(SpannerDbError::QueryError(format!(
                "row has {} values but rowType declares {} fields",
                raw.len(),
                fields.len()
            )));
        }
        let values = fields
            .iter()
            .zip(raw)
            .map(|(field, value)| decode_value(&field.ty, value))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(values);
    }

    let names = fields.into_iter().map(|f| f.name).collect();
    let result = QueryResult::from_rows(names, rows);
    Ok(match rows_affected {
        Some(count) => result.with_rows_affected(count),
        None => result,
    })
}

fn type_mismatch(ty: &TypeJson, value: &JsonValue) -> SpannerDbError {
    SpannerDbError::QueryError(format!("cannot read {value} as {}", ty.code))
}

/// Decode one REST value according to its Spanner type.
///
/// # Errors
/// Returns `SpannerDbError::QueryError` on a type mismatch.
pub fn decode_value(ty: &TypeJson, value: JsonValue) -> Result<RowValues, SpannerDbError> {
    if value.is_null() {
        return Ok(RowValues::Null);
    }
    match ty.code.as_str() {
        "INT64" | "ENUM" => match &value {
            JsonValue::String(s) => s.parse().map(RowValues::Int).map_err(|_| type_mismatch(ty, &value)),
            JsonValue::Number(n) => n.as_i64().map(RowValues::Int).ok_or_else(|| type_mismatch(ty, &value)),
            _ => Err(type_mismatch(ty, &value)),
        },
        "FLOAT64" | "FLOAT32" => match &value {
            JsonValue::Number(n) => n.as_f64().map(RowValues::Float).ok_or_else(|| type_mismatch(ty, &value)),
            JsonValue::String(s) => match s.as_str() {
                "NaN" => Ok(RowValues::Float(f64::NAN)),
                "Infinity" => Ok(RowValues::Float(f64::INFINITY)),
                "-Infinity" => Ok(RowValues::Float(f64::NEG_INFINITY)),
                _ => Err(type_mismatch(ty, &value)),
            },
            _ => Err(type_mismatch(ty, &value)),
        },
        "BOOL" => value.as_bool().map(RowValues::Bool).ok_or_else(|| type_mismatch(ty, &value)),
        "TIMESTAMP" => value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| RowValues::Timestamp(dt.with_timezone(&Utc)))
            .ok_or_else(|| type_mismatch(ty, &value)),
        "DATE" => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(RowValues::Date)
            .ok_or_else(|| type_mismatch(ty, &value)),
        "JSON" => match value {
            JsonValue::String(s) => Ok(serde_json::from_str(&s)
                .map_or_else(|_| RowValues::Text(s), RowValues::Json)),
            other => Ok(RowValues::Json(other)),
        },
        "NUMERIC" => into_string(ty, value).map(RowValues::Numeric),
        "BYTES" | "PROTO" => into_string(ty, value).map(RowValues::Bytes),
        "STRING" => into_string(ty, value).map(RowValues::Text),
        "ARRAY" => {
            let JsonValue::Array(items) = value else {
                return Err(type_mismatch(ty, &value));
            };
            let element = ty
                .array_element_type
                .as_deref()
                .ok_or_else(|| SpannerDbError::QueryError("ARRAY without element type".into()))?;
            items
                .into_iter()
                .map(|item| decode_value(element, item))
                .collect::<Result<Vec<_>, _>>()
                .map(RowValues::Array)
        }
        // STRUCT and anything newer than this client: keep the raw JSON.
        _ => Ok(match value {
            JsonValue::String(s) => RowValues::Text(s),
            other => RowValues::Json(other),
        }),
    }
}

fn into_string(ty: &TypeJson, value: JsonValue) -> Result<String, SpannerDbError> {
    match value {
        JsonValue::String(s) => Ok(s),
        other => Err(type_mismatch(ty, &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ty(code: &str) -> TypeJson {
        TypeJson {
            code: code.to_string(),
            array_element_type: None,
        }
    }

    #[test]
    fn decodes_typed_values() {
        assert_eq!(decode_value(&ty("INT64"), json!("42")).unwrap(), RowValues::Int(42));
        assert_eq!(decode_value(&ty("FLOAT64"), json!(0.25)).unwrap(), RowValues::Float(0.25));
        assert!(matches!(
            decode_value(&ty("FLOAT64"), json!("NaN")).unwrap(),
            RowValues::Float(f) if f.is_nan()
        ));
        assert_eq!(decode_value(&ty("BOOL"), json!(true)).unwrap(), RowValues::Bool(true));
        assert_eq!(decode_value(&ty("STRING"), json!("x")).unwrap(), RowValues::Text("x".into()));
        assert_eq!(
            decode_value(&ty("NUMERIC"), json!("1.50")).unwrap(),
            RowValues::Numeric("1.50".into())
        );
        assert_eq!(
            decode_value(&ty("DATE"), json!("2024-02-29")).unwrap(),
            RowValues::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(
            decode_value(&ty("JSON"), json!("{\"k\":[1,2]}")).unwrap(),
            RowValues::Json(json!({"k": [1, 2]}))
        );
        assert_eq!(decode_value(&ty("STRING"), JsonValue::Null).unwrap(), RowValues::Null);
    }

    #[test]
    fn decodes_arrays_with_element_type() {
        let array = TypeJson {
            code: "ARRAY".into(),
            array_element_type: Some(Box::new(ty("INT64"))),
        };
        assert_eq!(
            decode_value(&array, json!(["1", null, "3"])).unwrap(),
            RowValues::Array(vec![RowValues::Int(1), RowValues::Null, RowValues::Int(3)])
        );
    }

    #[test]
    fn rejects_mismatched_values() {
        assert!(matches!(
            decode_value(&ty("INT64"), json!("ten")),
            Err(SpannerDbError::QueryError(_))
        ));
        assert!(matches!(
            decode_value(&ty("BOOL"), json!("yes")),
            Err(SpannerDbError::QueryError(_))
        ));
    }

    #[tokio::test]
    async fn builds_result_from_rest_payload() {
        let payload = json!({
            "metadata": {"rowType": {"fields": [
                {"name": "entity_id", "type": {"code": "INT64"}},
                {"name": "sku", "type": {"code": "STRING"}},
                {"name": "updated_at", "type": {"code": "TIMESTAMP"}}
            ]}},
            "rows": [
                ["1", "abc", "2024-05-01T10:20:30.123456Z"],
                ["2", null, null]
            ]
        });
        let parsed: ResultSetJson = serde_json::from_value(payload).unwrap();
        let rows = build_query_result(parsed).unwrap().into_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("entity_id"), Some(&RowValues::Int(1)));
        assert_eq!(rows[0].get("sku").and_then(RowValues::as_text), Some("abc"));
        assert!(rows[0].get("updated_at").and_then(RowValues::as_timestamp).is_some());
        assert_eq!(rows[1].get("sku"), Some(&RowValues::Null));
    }

    #[test]
    fn reads_dml_stats_and_commit_timestamp() {
        let parsed: ResultSetJson =
            serde_json::from_value(json!({"stats": {"rowCountExact": "3"}})).unwrap();
        assert_eq!(parsed.row_count_exact().unwrap(), Some(3));

        let commit: CommitResponse =
            serde_json::from_value(json!({"commitTimestamp": "2024-05-01T10:20:30.5Z"})).unwrap();
        let ts = commit.timestamp().unwrap();
        assert_eq!(ts.to_string(), "2024-05-01T10:20:30.500Z");
    }

    #[test]
    fn empty_payload_is_an_empty_result() {
        let parsed: ResultSetJson = serde_json::from_str("{}").unwrap();
        let result = build_query_result(parsed).unwrap();
        assert!(result.column_names().is_empty());
        assert_eq!(result.rows_affected(), None);
    }
}
