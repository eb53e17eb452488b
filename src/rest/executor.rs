use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::config::{RestClient, classify};
use super::params::encode_mutation;
use super::query::{CommitResponse, ResultSetJson, build_query_result};
use super::session::{PooledSession, SessionPool, build_pool};
use super::transaction::RestTransaction;
use crate::client::{DatabaseTarget, Mutation, SpannerConnection, SpannerConnector};
use crate::error::SpannerDbError;
use crate::results::QueryResult;
use crate::types::{CommitTimestamp, TransactionMode};

/// Opens [`RestConnection`]s.
#[derive(Debug, Clone, Default)]
pub struct RestConnector {
    http: Option<reqwest::Client>,
}

impl RestConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client (proxies, timeouts, custom roots).
    #[must_use]
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http: Some(http) }
    }
}

#[async_trait]
impl SpannerConnector for RestConnector {
    type Connection = RestConnection;

    async fn connect(&self, target: &DatabaseTarget) -> Result<RestConnection, SpannerDbError> {
        let http = match &self.http {
            Some(http) => http.clone(),
            None => reqwest::Client::builder().build().map_err(|e| {
                SpannerDbError::ConnectionError(format!("Failed to build HTTP client: {e}"))
            })?,
        };
        let client = Arc::new(RestClient::new(http, target));
        let pool = build_pool(Arc::clone(&client), target.max_sessions)?;
        let conn = RestConnection { client, pool };

        // Fail here, not on the first query, when the database is unreachable.
        let session = conn.session().await?;
        debug!(session = %session.name(), base_url = conn.client.base_url(), "session pool ready");
        drop(session);

        Ok(conn)
    }
}

/// A session-pooled connection to one database over REST.
#[derive(Debug)]
pub struct RestConnection {
    client: Arc<RestClient>,
    pool: SessionPool,
}

impl RestConnection {
    #[must_use]
    pub fn client(&self) -> &RestClient {
        &self.client
    }

    #[must_use]
    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    async fn session(&self) -> Result<PooledSession, SpannerDbError> {
        self.pool.get().await.map_err(|e| {
            classify(
                SpannerDbError::from(e),
                SpannerDbError::ConnectionError,
                "session",
            )
        })
    }
}

#[async_trait]
impl SpannerConnection for RestConnection {
    type Transaction = RestTransaction;

    async fn execute(&self, sql: &str) -> Result<QueryResult, SpannerDbError> {
        let session = self.session().await?;
        let resource = format!("{}:executeSql", session.name());
        let body = json!({
            "sql": sql,
            "transaction": {"singleUse": {"readOnly": {"strong": true}}},
        });
        let result: ResultSetJson = self
            .client
            .post(&resource, &body)
            .await
            .map_err(|e| classify(e, SpannerDbError::QueryError, "executeSql"))?;
        build_query_result(result)
    }

    async fn commit_mutations(
        &self,
        mutations: Vec<Mutation>,
        mode: TransactionMode,
    ) -> Result<CommitTimestamp, SpannerDbError> {
        let encoded: Vec<_> = mutations.iter().map(encode_mutation).collect();
        let session = self.session().await?;
        let resource = format!("{}:commit", session.name());
        let body = match mode {
            TransactionMode::SingleUse => json!({
                "singleUseTransaction": {"readWrite": {}},
                "mutations": encoded,
            }),
            TransactionMode::ReadWrite => {
                let begin: serde_json::Value = self
                    .client
                    .post(
                        &format!("{}:beginTransaction", session.name()),
                        &json!({"options": {"readWrite": {}}}),
                    )
                    .await
                    .map_err(|e| {
                        classify(e, SpannerDbError::TransactionError, "beginTransaction")
                    })?;
                let id = begin.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
                    SpannerDbError::TransactionError("beginTransaction returned no id".into())
                })?;
                json!({"transactionId": id, "mutations": encoded})
            }
        };
        let response: CommitResponse = self
            .client
            .post(&resource, &body)
            .await
            .map_err(|e| classify(e, SpannerDbError::TransactionError, "commit"))?;
        response.timestamp()
    }

    async fn begin_transaction(&self) -> Result<RestTransaction, SpannerDbError> {
        let session = self.session().await?;
        RestTransaction::begin(Arc::clone(&self.client), session).await
    }

    async fn close(&self) -> Result<(), SpannerDbError> {
        let idle = Mutex::new(Vec::new());
        let _ = self.pool.retain(|session, _| {
            if let Ok(mut names) = idle.lock() {
                names.push(session.name().to_string());
            }
            false
        });
        self.pool.close();

        let names = idle
            .into_inner()
            .map_err(|_| SpannerDbError::Other("session list lock poisoned".into()))?;
        for name in names {
            if let Err(e) = self.client.delete(&name).await {
                warn!(session = %name, error = %e, "failed to delete session");
            }
        }
        Ok(())
    }
}
