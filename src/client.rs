//! The contract the adapter consumes from a Spanner client.
//!
//! A client opens one connection per [`DatabaseTarget`]; the connection owns whatever session
//! pool the client keeps and exposes plain SQL execution, mutation commits and imperative
//! read-write transactions.

use async_trait::async_trait;

use crate::config::redacted;
use crate::error::SpannerDbError;
use crate::results::{QueryResult, Row};
use crate::types::{CommitTimestamp, TransactionMode};

/// Fully qualified database a connection is opened against.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    pub project_id: String,
    pub instance_id: String,
    pub database_id: String,
    /// `host:port` of a local emulator, when routing there.
    pub emulator_host: Option<String>,
    pub max_sessions: usize,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseTarget")
            .field("project_id", &self.project_id)
            .field("instance_id", &self.instance_id)
            .field("database_id", &self.database_id)
            .field("emulator_host", &self.emulator_host)
            .field("max_sessions", &self.max_sessions)
            .field("access_token", &redacted(self.access_token.as_deref()))
            .finish()
    }
}

impl DatabaseTarget {
    /// `projects/{p}/instances/{i}/databases/{d}`
    #[must_use]
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project_id, self.instance_id, self.database_id
        )
    }
}

/// One buffered write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert { table: String, row: Row },
    /// Columns must include the table's primary key.
    Update { table: String, row: Row },
}

impl Mutation {
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Mutation::Insert { table, .. } | Mutation::Update { table, .. } => table,
        }
    }
}

/// Opens connections for a client implementation.
#[async_trait]
pub trait SpannerConnector: Send + Sync {
    type Connection: SpannerConnection;

    /// Open a session-pooled connection to `target`.
    async fn connect(&self, target: &DatabaseTarget) -> Result<Self::Connection, SpannerDbError>;
}

/// A live connection to one database.
#[async_trait]
pub trait SpannerConnection: Send + Sync {
    type Transaction: ReadWriteTransaction;

    /// Run a SQL statement in a strong read-only single-use transaction.
    async fn execute(&self, sql: &str) -> Result<QueryResult, SpannerDbError>;

    /// Apply `mutations` atomically, committing exactly once.
    async fn commit_mutations(
        &self,
        mutations: Vec<Mutation>,
        mode: TransactionMode,
    ) -> Result<CommitTimestamp, SpannerDbError>;

    /// Begin a read-write transaction for DML.
    async fn begin_transaction(&self) -> Result<Self::Transaction, SpannerDbError>;

    /// Release sessions held by this connection.
    async fn close(&self) -> Result<(), SpannerDbError>;
}

/// An open read-write transaction.
#[async_trait]
pub trait ReadWriteTransaction: Send {
    /// Execute DML, returning the exact number of rows modified.
    async fn execute_update(&mut self, sql: &str) -> Result<i64, SpannerDbError>;

    async fn commit(self) -> Result<CommitTimestamp, SpannerDbError>;

    async fn rollback(self) -> Result<(), SpannerDbError>;
}
