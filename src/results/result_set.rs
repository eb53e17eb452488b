use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use super::row::{Row, build_column_index};
use crate::error::SpannerDbError;
use crate::types::RowValues;

/// Source of raw row values behind a [`QueryResult`].
///
/// Clients that stream from the server implement this directly; clients that receive a whole
/// result in one response can use [`BufferedRows`].
#[async_trait]
pub trait RowCursor: Send {
    /// Pull the next row, or `None` once the result is exhausted.
    async fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SpannerDbError>;
}

/// Cursor over rows already held in memory.
#[derive(Debug, Default)]
pub struct BufferedRows {
    rows: VecDeque<Vec<RowValues>>,
}

impl BufferedRows {
    #[must_use]
    pub fn new(rows: Vec<Vec<RowValues>>) -> Self {
        Self { rows: rows.into() }
    }
}

#[async_trait]
impl RowCursor for BufferedRows {
    async fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SpannerDbError> {
        Ok(self.rows.pop_front())
    }
}

/// Lazy handle to the rows of one executed statement.
///
/// Rows are pulled from the cursor on demand and can be consumed once.
pub struct QueryResult {
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
    cursor: Box<dyn RowCursor>,
    rows_affected: Option<i64>,
}

impl std::fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult")
            .field("column_names", &self.column_names)
            .field("rows_affected", &self.rows_affected)
            .field("cursor", &"<RowCursor>")
            .finish()
    }
}

impl QueryResult {
    #[must_use]
    pub fn new(column_names: Vec<String>, cursor: Box<dyn RowCursor>) -> Self {
        let column_index = build_column_index(&column_names);
        Self {
            column_names: Arc::new(column_names),
            column_index,
            cursor,
            rows_affected: None,
        }
    }

    /// Result whose rows are already in memory.
    #[must_use]
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<RowValues>>) -> Self {
        Self::new(column_names, Box::new(BufferedRows::new(rows)))
    }

    /// Result with no columns and no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_rows(Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn with_rows_affected(mut self, rows_affected: i64) -> Self {
        self.rows_affected = Some(rows_affected);
        self
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Exact DML row count, when the server reported one.
    #[must_use]
    pub fn rows_affected(&self) -> Option<i64> {
        self.rows_affected
    }

    /// Pull the next row.
    ///
    /// # Errors
    /// Propagates errors raised by the underlying cursor.
    pub async fn next(&mut self) -> Result<Option<Row>, SpannerDbError> {
        let Some(values) = self.cursor.next_row().await? else {
            return Ok(None);
        };
        if values.len() != self.column_names.len() {
            return Err(SpannerDbError::QueryError(format!(
                "row has {} values but result declares {} columns",
                values.len(),
                self.column_names.len()
            )));
        }
        Ok(Some(Row::with_index(
            self.column_names.clone(),
            values,
            self.column_index.clone(),
        )))
    }

    /// Consume the handle, returning only its first row.
    ///
    /// # Errors
    /// Propagates errors raised by the underlying cursor.
    pub async fn first(mut self) -> Result<Option<Row>, SpannerDbError> {
        self.next().await
    }

    /// Drain the handle into memory.
    ///
    /// # Errors
    /// Propagates errors raised by the underlying cursor.
    pub async fn into_rows(mut self) -> Result<Vec<Row>, SpannerDbError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}
