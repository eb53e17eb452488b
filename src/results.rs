mod result_set;
mod row;

pub use result_set::{BufferedRows, QueryResult, RowCursor};
pub use row::Row;

/// Outcome of [`crate::SpannerAdapter::raw_fetch_row`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// No field was requested: the whole first row.
    Row(Row),
    /// The requested field of the first row.
    Value(crate::types::RowValues),
}

impl Fetched {
    #[must_use]
    pub fn into_row(self) -> Option<Row> {
        match self {
            Fetched::Row(row) => Some(row),
            Fetched::Value(_) => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<crate::types::RowValues> {
        match self {
            Fetched::Value(value) => Some(value),
            Fetched::Row(_) => None,
        }
    }
}
