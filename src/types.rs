use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

/// Values that can be stored in a Spanner row or written through a mutation.
///
/// ```rust
/// use spanner_adapter::prelude::*;
///
/// let values = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// `INT64`
    Int(i64),
    /// `FLOAT64`
    Float(f64),
    /// `NUMERIC`, kept in its decimal text form
    Numeric(String),
    /// `STRING`
    Text(String),
    /// `BOOL`
    Bool(bool),
    /// `TIMESTAMP`
    Timestamp(DateTime<Utc>),
    /// `DATE`
    Date(NaiveDate),
    /// `BYTES`, base64 text exactly as carried on the wire
    Bytes(String),
    /// `JSON`
    Json(JsonValue),
    /// `ARRAY<...>`
    Array(Vec<RowValues>),
    /// NULL value
    Null,
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RowValues::Text(value) | RowValues::Numeric(value) | RowValues::Bytes(value) => {
                Some(value)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.and_utc());
            }
        }
        None
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RowValues::Date(value) => Some(*value),
            RowValues::Timestamp(value) => Some(value.date_naive()),
            _ => None,
        }
    }

    /// Render the value as plain JSON, the way the REST API would print it for humans.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(v) => JsonValue::from(*v),
            RowValues::Float(v) => serde_json::Number::from_f64(*v)
                .map_or_else(|| JsonValue::String(v.to_string()), JsonValue::Number),
            RowValues::Numeric(v) | RowValues::Text(v) | RowValues::Bytes(v) => {
                JsonValue::String(v.clone())
            }
            RowValues::Bool(v) => JsonValue::Bool(*v),
            RowValues::Timestamp(v) => JsonValue::String(crate::dates::format_date(v)),
            RowValues::Date(v) => JsonValue::String(v.format("%Y-%m-%d").to_string()),
            RowValues::Json(v) => v.clone(),
            RowValues::Array(items) => {
                JsonValue::Array(items.iter().map(RowValues::to_json).collect())
            }
            RowValues::Null => JsonValue::Null,
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<DateTime<Utc>> for RowValues {
    fn from(value: DateTime<Utc>) -> Self {
        RowValues::Timestamp(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// How a batch of mutations is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// Mutations travel with the commit request; no transaction is begun first.
    #[default]
    SingleUse,
    /// A read-write transaction is begun, then committed with the mutations.
    ReadWrite,
}

/// Timestamp at which Spanner committed a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommitTimestamp(pub DateTime<Utc>);

impl CommitTimestamp {
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for CommitTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
    }
}
