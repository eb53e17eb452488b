use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, TimeZone};
use tracing::{debug, info, warn};

use crate::client::{Mutation, ReadWriteTransaction, SpannerConnection, SpannerConnector};
use crate::config::SpannerOptions;
use crate::error::SpannerDbError;
use crate::results::{Fetched, QueryResult, Row};
use crate::types::{CommitTimestamp, RowValues, TransactionMode};
use crate::{dates, ids, rewrite};

/// Future returned by the body of [`run_transaction`].
pub type TxFuture<'t, R> = Pin<Box<dyn Future<Output = Result<R, SpannerDbError>> + Send + 't>>;

/// What a DML transaction changed and when it committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmlOutcome {
    pub rows_affected: i64,
    pub commit_timestamp: CommitTimestamp,
}

/// Buffers mutations and commits them in one request.
///
/// Nothing reaches the database until [`SingleUseTransaction::commit`], which issues exactly
/// one commit call.
#[derive(Debug)]
pub struct SingleUseTransaction<'c, T: SpannerConnection> {
    conn: &'c T,
    mode: TransactionMode,
    mutations: Vec<Mutation>,
}

impl<'c, T: SpannerConnection> SingleUseTransaction<'c, T> {
    #[must_use]
    pub fn new(conn: &'c T, mode: TransactionMode) -> Self {
        Self {
            conn,
            mode,
            mutations: Vec::new(),
        }
    }

    /// Queue one insert per row.
    pub fn insert_batch<I>(&mut self, table: &str, rows: I) -> &mut Self
    where
        I: IntoIterator<Item = Row>,
    {
        self.mutations
            .extend(rows.into_iter().map(|row| Mutation::Insert {
                table: table.to_string(),
                row,
            }));
        self
    }

    /// Queue one update per row; each row must carry the key column(s).
    pub fn update_batch<I>(&mut self, table: &str, rows: I) -> &mut Self
    where
        I: IntoIterator<Item = Row>,
    {
        self.mutations
            .extend(rows.into_iter().map(|row| Mutation::Update {
                table: table.to_string(),
                row,
            }));
        self
    }

    #[must_use]
    pub fn pending(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Commit every queued mutation atomically.
    ///
    /// # Errors
    /// Returns the client's error if the commit is rejected; nothing is retried.
    pub async fn commit(self) -> Result<CommitTimestamp, SpannerDbError> {
        let count = self.mutations.len();
        let ts = self.conn.commit_mutations(self.mutations, self.mode).await?;
        debug!(mutations = count, commit_timestamp = %ts, "mutations committed");
        Ok(ts)
    }
}

/// Run `work` inside a read-write transaction on `conn`.
///
/// The transaction is committed once if `work` succeeds and rolled back if it fails. There is
/// no retry on abort: the caller sees the error and decides.
///
/// # Errors
/// Returns the error from `work`, or from begin/commit.
pub async fn run_transaction<T, R, F>(
    conn: &T,
    work: F,
) -> Result<(R, CommitTimestamp), SpannerDbError>
where
    T: SpannerConnection,
    F: for<'t> FnOnce(&'t mut T::Transaction) -> TxFuture<'t, R>,
{
    let mut tx = conn.begin_transaction().await?;
    let outcome = work(&mut tx).await;
    match outcome {
        Ok(value) => {
            let ts = tx.commit().await?;
            Ok((value, ts))
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback after failed transaction body also failed");
            }
            Err(err)
        }
    }
}

/// Framework-facing adapter over one Spanner database.
///
/// The adapter is either disconnected or connected. The first operation that needs the
/// database connects; [`SpannerAdapter::close_connection`] goes back to disconnected.
///
/// ```rust,no_run
/// # #[cfg(feature = "rest")]
/// # async fn demo() -> Result<(), spanner_adapter::SpannerDbError> {
/// use spanner_adapter::prelude::*;
///
/// let opts = SpannerOptions::builder().emulator("localhost:9020").finish()?;
/// let mut adapter = SpannerAdapter::rest(opts)?;
/// let rows = adapter.fetch_all("SELECT entity_id, sku FROM catalog_product_entity").await?;
/// for row in &rows {
///     println!("{}", row.to_json());
/// }
/// adapter.close_connection().await?;
/// # Ok(())
/// # }
/// ```
pub struct SpannerAdapter<C: SpannerConnector> {
    options: SpannerOptions,
    connector: C,
    connection: Option<C::Connection>,
}

impl<C: SpannerConnector> std::fmt::Debug for SpannerAdapter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannerAdapter")
            .field("options", &self.options)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl<C: SpannerConnector> SpannerAdapter<C> {
    /// Create a disconnected adapter.
    ///
    /// # Errors
    /// Returns `SpannerDbError::ConfigError` if `options` fail validation.
    pub fn new(options: SpannerOptions, connector: C) -> Result<Self, SpannerDbError> {
        options.validate()?;
        Ok(Self {
            options,
            connector,
            connection: None,
        })
    }

    #[must_use]
    pub fn options(&self) -> &SpannerOptions {
        &self.options
    }

    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the connection if it is not open yet.
    ///
    /// # Errors
    /// Returns the connector's error; the adapter stays disconnected.
    pub async fn connect(&mut self) -> Result<(), SpannerDbError> {
        if self.connection.is_some() {
            return Ok(());
        }
        let target = self.options.target();
        let conn = self.connector.connect(&target).await?;
        info!(
            database = %target.database_path(),
            emulator = target.emulator_host.as_deref().unwrap_or("-"),
            max_sessions = target.max_sessions,
            "connected to spanner"
        );
        self.connection = Some(conn);
        Ok(())
    }

    async fn connection(&mut self) -> Result<&C::Connection, SpannerDbError> {
        self.connect().await?;
        self.connection
            .as_ref()
            .ok_or_else(|| SpannerDbError::ConnectionError("connection unavailable".to_string()))
    }

    /// Execute raw SQL and return a lazy handle to its rows. Nothing is bound or escaped.
    ///
    /// # Errors
    /// Returns connection or query errors from the client.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult, SpannerDbError> {
        debug!(sql, "query");
        self.connection().await?.execute(sql).await
    }

    /// Same as [`SpannerAdapter::query`].
    ///
    /// # Errors
    /// Returns connection or query errors from the client.
    pub async fn raw_query(&mut self, sql: &str) -> Result<QueryResult, SpannerDbError> {
        self.query(sql).await
    }

    /// Same as [`SpannerAdapter::query`]; Spanner runs one statement per call either way.
    ///
    /// # Errors
    /// Returns connection or query errors from the client.
    pub async fn multi_query(&mut self, sql: &str) -> Result<QueryResult, SpannerDbError> {
        self.query(sql).await
    }

    /// Drain a result handle into memory.
    ///
    /// # Errors
    /// Propagates errors raised while pulling rows.
    pub async fn fetch(&self, result: QueryResult) -> Result<Vec<Row>, SpannerDbError> {
        result.into_rows().await
    }

    /// First row of a result handle, or `None` if it has no rows.
    ///
    /// # Errors
    /// Propagates errors raised while pulling rows.
    pub async fn fetch_one(&self, result: QueryResult) -> Result<Option<Row>, SpannerDbError> {
        result.first().await
    }

    /// Run `sql` and return every row; an empty result is an empty `Vec`.
    ///
    /// # Errors
    /// Returns connection or query errors from the client.
    pub async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>, SpannerDbError> {
        let result = self.query(sql).await?;
        self.fetch(result).await
    }

    /// Run `sql` and return its first row.
    ///
    /// # Errors
    /// Returns connection or query errors from the client.
    pub async fn fetch_row(&mut self, sql: &str) -> Result<Option<Row>, SpannerDbError> {
        let result = self.query(sql).await?;
        self.fetch_one(result).await
    }

    /// Run `sql`; return the first row, or only `field` of it when a field is given.
    ///
    /// `None` means there were no rows, or the first row has no such field.
    ///
    /// # Errors
    /// Returns connection or query errors from the client.
    pub async fn raw_fetch_row(
        &mut self,
        sql: &str,
        field: Option<&str>,
    ) -> Result<Option<Fetched>, SpannerDbError> {
        let Some(row) = self.fetch_row(sql).await? else {
            return Ok(None);
        };
        match field.filter(|f| !f.is_empty()) {
            None => Ok(Some(Fetched::Row(row))),
            Some(field) => Ok(row.get(field).cloned().map(Fetched::Value)),
        }
    }

    /// Start buffering mutations against this adapter's connection.
    ///
    /// # Errors
    /// Returns connection errors from the client.
    pub async fn transaction(
        &mut self,
        mode: TransactionMode,
    ) -> Result<SingleUseTransaction<'_, C::Connection>, SpannerDbError> {
        let conn = self.connection().await?;
        Ok(SingleUseTransaction::new(conn, mode))
    }

    /// Insert one row in a single-use transaction.
    ///
    /// # Errors
    /// Returns connection or commit errors from the client.
    pub async fn insert(&mut self, table: &str, row: Row) -> Result<CommitTimestamp, SpannerDbError> {
        self.insert_rows(table, vec![row]).await
    }

    /// Insert several rows into one table in a single-use transaction.
    ///
    /// # Errors
    /// Returns connection or commit errors from the client.
    pub async fn insert_rows(
        &mut self,
        table: &str,
        rows: Vec<Row>,
    ) -> Result<CommitTimestamp, SpannerDbError> {
        let count = rows.len();
        let mut tx = self.transaction(TransactionMode::SingleUse).await?;
        tx.insert_batch(table, rows);
        let ts = tx.commit().await?;
        debug!(table, rows = count, "insert committed");
        Ok(ts)
    }

    /// Insert `rows_per_table[i]` into `tables[i]` for every `i`, all in one transaction.
    ///
    /// # Errors
    /// Returns `SpannerDbError::ParameterError` if the two slices differ in length (checked
    /// before connecting), otherwise connection or commit errors from the client.
    pub async fn insert_array<S: AsRef<str>>(
        &mut self,
        tables: &[S],
        rows_per_table: Vec<Vec<Row>>,
    ) -> Result<CommitTimestamp, SpannerDbError> {
        if tables.len() != rows_per_table.len() {
            return Err(SpannerDbError::ParameterError(format!(
                "insert_array got {} tables but {} row sets",
                tables.len(),
                rows_per_table.len()
            )));
        }
        let mut tx = self.transaction(TransactionMode::SingleUse).await?;
        for (table, rows) in tables.iter().zip(rows_per_table) {
            tx.insert_batch(table.as_ref(), rows);
        }
        let ts = tx.commit().await?;
        debug!(tables = tables.len(), "multi-table insert committed");
        Ok(ts)
    }

    /// Set `bind_col = bind_value` on the row whose key `where_col` equals `where_value`.
    ///
    /// `where_col` must be the table's primary key: the update is sent as a mutation, which
    /// addresses rows by key.
    ///
    /// # Errors
    /// Returns connection or commit errors from the client, including the server's error when
    /// no such row exists.
    pub async fn update(
        &mut self,
        table: &str,
        bind_col: &str,
        bind_value: impl Into<RowValues>,
        where_col: &str,
        where_value: impl Into<RowValues>,
    ) -> Result<CommitTimestamp, SpannerDbError> {
        let row = Row::from_pairs([
            (where_col, where_value.into()),
            (bind_col, bind_value.into()),
        ]);
        let mut tx = self.transaction(TransactionMode::SingleUse).await?;
        tx.update_batch(table, [row]);
        let ts = tx.commit().await?;
        debug!(table, column = bind_col, "update committed");
        Ok(ts)
    }

    /// Run `DELETE FROM <table> WHERE <where_clause>` in a read-write transaction.
    ///
    /// The clause is inserted verbatim.
    ///
    /// # Errors
    /// Returns connection, DML or commit errors from the client.
    pub async fn delete(
        &mut self,
        table: &str,
        where_clause: &str,
    ) -> Result<DmlOutcome, SpannerDbError> {
        let sql = format!("DELETE FROM {table} WHERE {where_clause}");
        debug!(sql = %sql, "delete");
        let conn = self.connection().await?;
        let (rows_affected, commit_timestamp) = run_transaction(conn, move |tx| {
            Box::pin(async move { tx.execute_update(&sql).await })
        })
        .await?;
        Ok(DmlOutcome {
            rows_affected,
            commit_timestamp,
        })
    }

    /// Run `work` in a read-write transaction on this adapter's connection.
    ///
    /// # Errors
    /// See [`run_transaction`].
    pub async fn run_transaction<R, F>(
        &mut self,
        work: F,
    ) -> Result<(R, CommitTimestamp), SpannerDbError>
    where
        F: for<'t> FnOnce(
            &'t mut <C::Connection as SpannerConnection>::Transaction,
        ) -> TxFuture<'t, R>,
    {
        let conn = self.connection().await?;
        run_transaction(conn, work).await
    }

    /// Release the connection. Does nothing when not connected.
    ///
    /// # Errors
    /// Returns the client's error from closing; the adapter is disconnected either way.
    pub async fn close_connection(&mut self) -> Result<(), SpannerDbError> {
        if let Some(conn) = self.connection.take() {
            conn.close().await?;
            info!("spanner connection closed");
        }
        Ok(())
    }

    /// See [`rewrite::sanitize_sql`].
    #[must_use]
    pub fn sanitize_sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        rewrite::sanitize_sql(sql)
    }

    /// See [`rewrite::add_cast`].
    #[must_use]
    pub fn add_cast<'a>(&self, sql: &'a str, column: &str, ty: &str) -> Cow<'a, str> {
        rewrite::add_cast(sql, column, ty)
    }

    /// See [`dates::format_date`].
    #[must_use]
    pub fn format_date<Tz: TimeZone>(&self, date: &DateTime<Tz>) -> String {
        dates::format_date(date)
    }

    /// See [`dates::convert_date`].
    ///
    /// # Errors
    /// Returns `SpannerDbError::InvalidDate` for unparseable input.
    pub fn convert_date(&self, input: &str) -> Result<String, SpannerDbError> {
        dates::convert_date(input)
    }

    /// See [`ids::get_auto_increment`].
    #[must_use]
    pub fn get_auto_increment(&self) -> String {
        ids::get_auto_increment()
    }
}
