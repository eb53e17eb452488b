//! Adapter between a PHP-style database abstraction and Google Cloud Spanner.
//!
//! [`SpannerAdapter`] owns the connection lifecycle and exposes the query, fetch and
//! mutation operations a framework database layer expects. SQL written for MySQL can be
//! nudged towards GoogleSQL with [`sanitize_sql`] and [`add_cast`].
//!
//! The adapter talks to Spanner through the traits in [`client`]; the `rest` feature
//! (on by default) provides an implementation over the Cloud Spanner REST API.

pub mod adapter;
pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod ids;
pub mod prelude;
pub mod results;
pub mod rewrite;
pub mod types;

#[cfg(feature = "rest")]
pub mod rest;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use adapter::{DmlOutcome, SingleUseTransaction, SpannerAdapter, TxFuture, run_transaction};
pub use client::{DatabaseTarget, Mutation, ReadWriteTransaction, SpannerConnection, SpannerConnector};
pub use config::{SpannerOptions, SpannerOptionsBuilder};
pub use dates::{convert_date, format_date, format_now};
pub use error::SpannerDbError;
pub use ids::get_auto_increment;
pub use results::{Fetched, QueryResult, Row};
pub use rewrite::{add_cast, sanitize_sql, unquote};
pub use types::{CommitTimestamp, RowValues, TransactionMode};
