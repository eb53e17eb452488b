//! Cloud Spanner REST client.
//!
//! Layout:
//! - `config`: endpoint selection and the shared HTTP client
//! - `session`: `deadpool` manager that keeps the session pool
//! - `params`: encoding of `RowValues` and mutations into REST JSON
//! - `query`: decoding of REST result sets into `QueryResult`
//! - `executor`: the `SpannerConnector`/`SpannerConnection` implementations
//! - `transaction`: read-write transactions for DML

pub mod config;
pub mod executor;
pub mod params;
pub mod query;
pub mod session;
pub mod transaction;

#[cfg(test)]
mod test_server;

pub use config::RestClient;
pub use executor::{RestConnection, RestConnector};
pub use transaction::RestTransaction;

use crate::adapter::SpannerAdapter;
use crate::config::SpannerOptions;
use crate::error::SpannerDbError;

impl SpannerAdapter<RestConnector> {
    /// Adapter backed by the REST client.
    ///
    /// # Errors
    /// Returns `SpannerDbError::ConfigError` if `options` fail validation.
    pub fn rest(options: SpannerOptions) -> Result<Self, SpannerDbError> {
        Self::new(options, RestConnector::new())
    }
}
