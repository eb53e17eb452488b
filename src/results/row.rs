use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::error::SpannerDbError;
use crate::types::RowValues;

/// A single row: ordered column names paired with their values.
///
/// Rows flow both ways through the adapter. Query results are materialized into `Row`s, and
/// `insert`/`update` take `Row`s as the column-value pairs to write.
#[derive(Debug, Clone)]
pub struct Row {
    /// The column names for this row (shared across all rows of one result)
    column_names: Arc<Vec<String>>,
    /// The values for this row, in column order
    values: Vec<RowValues>,
    // Lookup cache shared by all rows of one result
    column_index: Arc<HashMap<String, usize>>,
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

pub(crate) fn build_column_index(column_names: &[String]) -> Arc<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // First occurrence wins for duplicated names
        index.entry(name.clone()).or_insert(i);
    }
    Arc::new(index)
}

impl Row {
    /// Create a new row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `values` - The values for this row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let column_index = build_column_index(&column_names);
        Self {
            column_names,
            values,
            column_index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        values: Vec<RowValues>,
        column_index: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Build a row from `(column, value)` pairs, keeping their order.
    ///
    /// ```rust
    /// use spanner_adapter::prelude::*;
    ///
    /// let row = Row::from_pairs([("entity_id", RowValues::Int(7)), ("sku", "abc".into())]);
    /// assert_eq!(row.get("sku").and_then(RowValues::as_text), Some("abc"));
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RowValues>,
    {
        let (names, values): (Vec<String>, Vec<RowValues>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(Arc::new(names), values)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Get a value from the row by column name, or `None` if the column is absent.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Like [`Row::get`], but an absent column is an error.
    ///
    /// # Errors
    /// Returns `SpannerDbError::NotFound` when the row has no such column.
    pub fn require(&self, column_name: &str) -> Result<&RowValues, SpannerDbError> {
        self.get(column_name)
            .ok_or_else(|| SpannerDbError::NotFound(format!("column `{column_name}`")))
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Render the row as a JSON object keyed by column name.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::with_capacity(self.values.len());
        for (name, value) in self.iter() {
            map.insert(name.to_string(), value.to_json());
        }
        JsonValue::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_by_name_and_index() {
        let row = Row::from_pairs([("a", RowValues::Int(1)), ("b", RowValues::Null)]);
        assert_eq!(row.get("a"), Some(&RowValues::Int(1)));
        assert_eq!(row.get_by_index(1), Some(&RowValues::Null));
        assert_eq!(row.get("c"), None);
        assert_eq!(row.columns(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn require_reports_missing_column() {
        let row = Row::from_pairs([("a", 1_i64)]);
        assert!(row.require("a").is_ok());
        let err = row.require("missing").unwrap_err();
        assert!(matches!(err, SpannerDbError::NotFound(_)));
    }

    #[test]
    fn json_keeps_column_names() {
        let row = Row::from_pairs([("id", RowValues::Int(3)), ("name", "x".into())]);
        assert_eq!(row.to_json(), serde_json::json!({"id": 3, "name": "x"}));
    }
}
