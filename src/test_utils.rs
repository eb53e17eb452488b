//! In-memory client for exercising the adapter without a database.
//!
//! [`FakeConnector`] records every call it receives and answers queries from canned results.
//! Clones share state, so a test can keep one handle and give another to the adapter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use crate::client::{
    DatabaseTarget, Mutation, ReadWriteTransaction, SpannerConnection, SpannerConnector,
};
use crate::error::SpannerDbError;
use crate::results::QueryResult;
use crate::types::{CommitTimestamp, RowValues, TransactionMode};

/// One commit as the fake received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommit {
    pub mutations: Vec<Mutation>,
    pub mode: TransactionMode,
}

#[derive(Debug, Default)]
struct FakeState {
    connects: usize,
    closes: usize,
    rollbacks: usize,
    targets: Vec<DatabaseTarget>,
    commits: Vec<RecordedCommit>,
    queries: Vec<String>,
    dml: Vec<String>,
    results: HashMap<String, (Vec<String>, Vec<Vec<RowValues>>)>,
    dml_counts: HashMap<String, i64>,
    fail_connect: Option<String>,
    fail_commit: Option<String>,
    fail_dml: Option<String>,
}

/// Recording stand-in for a Spanner client.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer `sql` with these columns and rows. Unknown SQL yields an empty result.
    #[must_use]
    pub fn with_result(self, sql: &str, columns: &[&str], rows: Vec<Vec<RowValues>>) -> Self {
        let columns = columns.iter().map(|c| (*c).to_string()).collect();
        self.state().results.insert(sql.to_string(), (columns, rows));
        self
    }

    /// Report `count` modified rows for DML `sql`. Unknown DML reports zero.
    #[must_use]
    pub fn with_dml_count(self, sql: &str, count: i64) -> Self {
        self.state().dml_counts.insert(sql.to_string(), count);
        self
    }

    #[must_use]
    pub fn failing_connect(self, message: &str) -> Self {
        self.state().fail_connect = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn failing_commit(self, message: &str) -> Self {
        self.state().fail_commit = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn failing_dml(self, message: &str) -> Self {
        self.state().fail_dml = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    #[must_use]
    pub fn rollback_count(&self) -> usize {
        self.state().rollbacks
    }

    #[must_use]
    pub fn targets(&self) -> Vec<DatabaseTarget> {
        self.state().targets.clone()
    }

    /// Every commit attempt, including rejected ones.
    #[must_use]
    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.state().commits.clone()
    }

    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.state().queries.clone()
    }

    #[must_use]
    pub fn dml(&self) -> Vec<String> {
        self.state().dml.clone()
    }
}

fn commit_timestamp(sequence: usize) -> CommitTimestamp {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
    let offset = i64::try_from(sequence).unwrap_or(i64::MAX);
    CommitTimestamp(base + Duration::seconds(offset))
}

#[async_trait]
impl SpannerConnector for FakeConnector {
    type Connection = FakeConnection;

    async fn connect(&self, target: &DatabaseTarget) -> Result<FakeConnection, SpannerDbError> {
        let mut state = self.state();
        if let Some(message) = &state.fail_connect {
            return Err(SpannerDbError::ConnectionError(message.clone()));
        }
        state.connects += 1;
        state.targets.push(target.clone());
        Ok(FakeConnection {
            state: Arc::clone(&self.state),
        })
    }
}

/// Connection handed out by [`FakeConnector`].
#[derive(Debug)]
pub struct FakeConnection {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnection {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SpannerConnection for FakeConnection {
    type Transaction = FakeTransaction;

    async fn execute(&self, sql: &str) -> Result<QueryResult, SpannerDbError> {
        let mut state = self.state();
        state.queries.push(sql.to_string());
        Ok(match state.results.get(sql) {
            Some((columns, rows)) => QueryResult::from_rows(columns.clone(), rows.clone()),
            None => QueryResult::empty(),
        })
    }

    async fn commit_mutations(
        &self,
        mutations: Vec<Mutation>,
        mode: TransactionMode,
    ) -> Result<CommitTimestamp, SpannerDbError> {
        let mut state = self.state();
        state.commits.push(RecordedCommit { mutations, mode });
        if let Some(message) = &state.fail_commit {
            return Err(SpannerDbError::TransactionError(message.clone()));
        }
        Ok(commit_timestamp(state.commits.len()))
    }

    async fn begin_transaction(&self) -> Result<FakeTransaction, SpannerDbError> {
        Ok(FakeTransaction {
            state: Arc::clone(&self.state),
            statements: Vec::new(),
        })
    }

    async fn close(&self) -> Result<(), SpannerDbError> {
        self.state().closes += 1;
        Ok(())
    }
}

/// Read-write transaction handed out by [`FakeConnection`].
///
/// DML is only recorded on the connector once the transaction commits.
#[derive(Debug)]
pub struct FakeTransaction {
    state: Arc<Mutex<FakeState>>,
    statements: Vec<String>,
}

impl FakeTransaction {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ReadWriteTransaction for FakeTransaction {
    async fn execute_update(&mut self, sql: &str) -> Result<i64, SpannerDbError> {
        let count = {
            let state = self.state();
            if let Some(message) = &state.fail_dml {
                return Err(SpannerDbError::QueryError(message.clone()));
            }
            state.dml_counts.get(sql).copied().unwrap_or(0)
        };
        self.statements.push(sql.to_string());
        Ok(count)
    }

    async fn commit(self) -> Result<CommitTimestamp, SpannerDbError> {
        let mut state = self.state();
        state.commits.push(RecordedCommit {
            mutations: Vec::new(),
            mode: TransactionMode::ReadWrite,
        });
        if let Some(message) = &state.fail_commit {
            return Err(SpannerDbError::TransactionError(message.clone()));
        }
        state.dml.extend(self.statements.iter().cloned());
        Ok(commit_timestamp(state.commits.len()))
    }

    async fn rollback(self) -> Result<(), SpannerDbError> {
        self.state().rollbacks += 1;
        Ok(())
    }
}
