use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use super::config::{RestClient, classify};
use super::query::{CommitResponse, ResultSetJson};
use super::session::PooledSession;
use crate::client::ReadWriteTransaction;
use crate::error::SpannerDbError;
use crate::types::CommitTimestamp;

#[derive(Debug, Deserialize)]
struct BeginResponse {
    id: String,
}

/// A read-write transaction pinned to one pooled session.
///
/// The session goes back to the pool when the transaction is committed, rolled back or dropped.
#[derive(Debug)]
pub struct RestTransaction {
    client: Arc<RestClient>,
    session: PooledSession,
    id: String,
    seqno: i64,
}

impl RestTransaction {
    /// Begin a read-write transaction on `session`.
    ///
    /// # Errors
    /// Returns `SpannerDbError::TransactionError` if the server refuses to begin.
    pub async fn begin(
        client: Arc<RestClient>,
        session: PooledSession,
    ) -> Result<Self, SpannerDbError> {
        let resource = format!("{}:beginTransaction", session.name());
        let response: BeginResponse = client
            .post(&resource, &json!({"options": {"readWrite": {}}}))
            .await
            .map_err(|e| classify(e, SpannerDbError::TransactionError, "beginTransaction"))?;
        debug!(transaction = %response.id, "read-write transaction started");
        Ok(Self {
            client,
            session,
            id: response.id,
            seqno: 0,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl ReadWriteTransaction for RestTransaction {
    async fn execute_update(&mut self, sql: &str) -> Result<i64, SpannerDbError> {
        self.seqno += 1;
        let resource = format!("{}:executeSql", self.session.name());
        let body = json!({
            "sql": sql,
            "transaction": {"id": self.id},
            "seqno": self.seqno.to_string(),
        });
        let result: ResultSetJson = self
            .client
            .post(&resource, &body)
            .await
            .map_err(|e| classify(e, SpannerDbError::QueryError, "executeSql"))?;
        result.row_count_exact()?.ok_or_else(|| {
            SpannerDbError::QueryError(format!("statement returned no row count: {sql}"))
        })
    }

    async fn commit(self) -> Result<CommitTimestamp, SpannerDbError> {
        let resource = format!("{}:commit", self.session.name());
        let response: CommitResponse = self
            .client
            .post(&resource, &json!({"transactionId": self.id}))
            .await
            .map_err(|e| classify(e, SpannerDbError::TransactionError, "commit"))?;
        response.timestamp()
    }

    async fn rollback(self) -> Result<(), SpannerDbError> {
        let resource = format!("{}:rollback", self.session.name());
        let _: JsonValue = self
            .client
            .post(&resource, &json!({"transactionId": self.id}))
            .await
            .map_err(|e| classify(e, SpannerDbError::TransactionError, "rollback"))?;
        debug!(transaction = %self.id, "transaction rolled back");
        Ok(())
    }
}
