//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::adapter::{DmlOutcome, SpannerAdapter, TxFuture};
pub use crate::client::{ReadWriteTransaction, SpannerConnection, SpannerConnector};
pub use crate::config::SpannerOptions;
pub use crate::error::SpannerDbError;
pub use crate::results::{Fetched, QueryResult, Row};
pub use crate::rewrite::{add_cast, sanitize_sql};
pub use crate::types::{CommitTimestamp, RowValues, TransactionMode};

#[cfg(feature = "rest")]
pub use crate::rest::RestConnector;
