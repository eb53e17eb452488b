use thiserror::Error;

#[cfg(feature = "rest")]
use deadpool::managed::PoolError;

#[derive(Debug, Error)]
pub enum SpannerDbError {
    #[cfg(feature = "rest")]
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("Spanner API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Other database error: {0}")]
    Other(String),
}

#[cfg(feature = "rest")]
impl From<PoolError<SpannerDbError>> for SpannerDbError {
    fn from(err: PoolError<SpannerDbError>) -> Self {
        match err {
            PoolError::Backend(inner) => inner,
            other => SpannerDbError::ConnectionError(format!("Spanner session pool error: {other}")),
        }
    }
}
