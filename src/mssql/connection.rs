use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use super::client::{MssqlClient, create_mssql_client};
use super::cursor::MssqlCursor;
use super::query::to_row_value;
use super::statement::MssqlStatement;
use crate::config::ConnectionConfig;
use crate::connection::{Connection, ConnectionState, end_transaction_sql};
use crate::cursor::Cursor;
use crate::dialect::{Dialect, MssqlDialect};
use crate::error::DbConnError;
use crate::statement::Statement;
use crate::types::{DatabaseType, EndMethod, FetchShape, IsolationLevel, RowValues};

/// `@@IDENTITY` is session wide, so it sees inserts made through `sp_executesql`.
const LAST_KEY_SQL: &str = "SELECT @@IDENTITY";

/// Appended to `exec_sql` batches. `@@ROWCOUNT` still holds the count of the last
/// statement before it.
const ROWCOUNT_SQL: &str = "\n;SELECT @@ROWCOUNT";

/// Module definitions must be the only statement in their batch.
fn must_run_alone(sql: &str) -> bool {
    let words: Vec<String> = sql
        .split_whitespace()
        .take(4)
        .map(str::to_ascii_uppercase)
        .collect();
    let object = match words.as_slice() {
        [create, or, alter, object, ..] if create == "CREATE" && or == "OR" && alter == "ALTER" => {
            object
        }
        [verb, object, ..] if verb == "CREATE" || verb == "ALTER" => object,
        _ => return false,
    };
    matches!(
        object.as_str(),
        "PROCEDURE" | "PROC" | "FUNCTION" | "TRIGGER" | "VIEW"
    )
}

static DIALECT: MssqlDialect = MssqlDialect;

/// A blocking SQL Server session.
///
/// Everything except prepared statements is sent as a plain batch, so temporary tables,
/// `SET` options and `USE` outlive the call that made them.
pub struct MssqlConnection {
    config: ConnectionConfig,
    runtime: Runtime,
    client: Option<MssqlClient>,
    state: ConnectionState,
}

impl MssqlConnection {
    /// A disconnected session for `config`.
    ///
    /// # Errors
    /// Returns `DbConnError::ConfigError` if `config` is not for SQL Server, or
    /// `DbConnError::ConnectionError` if the runtime cannot be started.
    pub fn new(config: ConnectionConfig) -> Result<Self, DbConnError> {
        if config.driver != DatabaseType::Mssql {
            return Err(DbConnError::ConfigError(format!(
                "{} settings given to the mssql driver",
                config.driver.as_str()
            )));
        }
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let state = ConnectionState::new(config.end_method);
        Ok(Self {
            config,
            runtime,
            client: None,
            state,
        })
    }

    /// Create and connect.
    ///
    /// # Errors
    /// See [`MssqlConnection::new`] and [`Connection::connect`].
    pub fn open(config: ConnectionConfig) -> Result<Self, DbConnError> {
        let mut conn = Self::new(config)?;
        conn.connect()?;
        Ok(conn)
    }

    /// Send `sql` as a batch and drain its results.
    fn batch(&mut self, sql: &str) -> Result<(), DbConnError> {
        debug!(sql, "mssql batch");
        let client = self.client.as_mut().ok_or(DbConnError::NotConnected)?;
        self.runtime.block_on(async {
            client.simple_query(sql).await?.into_results().await?;
            Ok::<_, tiberius::error::Error>(())
        })?;
        Ok(())
    }

    /// Run `sql` as a batch and report the rows its last statement touched.
    fn counted_batch(&mut self, sql: &str) -> Result<u64, DbConnError> {
        let client = self.client.as_mut().ok_or(DbConnError::NotConnected)?;
        let batch = format!("{}{ROWCOUNT_SQL}", sql.trim_end().trim_end_matches(';'));
        let results = self
            .runtime
            .block_on(async { client.simple_query(batch).await?.into_results().await })?;
        Ok(results
            .into_iter()
            .last()
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.into_iter().next())
            .map(to_row_value)
            .and_then(|count| count.to_i64())
            .and_then(|count| u64::try_from(count).ok())
            .unwrap_or(0))
    }

    /// First column of the first row of `sql`.
    fn scalar(&mut self, sql: &str) -> Result<RowValues, DbConnError> {
        let client = self.client.as_mut().ok_or(DbConnError::NotConnected)?;
        let row = self
            .runtime
            .block_on(async { client.simple_query(sql).await?.into_row().await })?;
        Ok(row
            .and_then(|row| row.into_iter().next())
            .map_or(RowValues::Null, to_row_value))
    }

    fn end_transaction(&mut self, sql: &str) -> Result<(), DbConnError> {
        let result = self.batch(sql);
        self.state.in_transaction = false;
        result
    }

    fn close_session(&mut self) -> Result<(), DbConnError> {
        let Some(mut client) = self.client.take() else {
            return Ok(());
        };
        let end_sql = if self.state.in_transaction {
            end_transaction_sql(&DIALECT, self.state.end_method)
        } else {
            None
        };
        self.state.in_transaction = false;
        self.runtime.block_on(async move {
            let ended = match end_sql {
                Some(sql) => match client.simple_query(sql).await {
                    Ok(stream) => stream.into_results().await.map(drop),
                    Err(e) => Err(e),
                },
                None => Ok(()),
            };
            let closed = client.close().await;
            ended.and(closed)
        })?;
        info!(host = %self.config.host, "mssql disconnected");
        Ok(())
    }
}

impl Connection for MssqlConnection {
    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn state(&self) -> &ConnectionState {
        &self.state
    }

    fn connect(&mut self) -> Result<(), DbConnError> {
        if self.client.is_some() {
            return Ok(());
        }
        let result = self
            .runtime
            .block_on(create_mssql_client(&self.config))
            .map(|client| {
                self.client = Some(client);
                self.state.in_transaction = false;
                self.state.isolation = self
                    .scalar(DIALECT.read_isolation_sql())
                    .map(|v| DIALECT.parse_isolation(&v))
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "could not read the session isolation level");
                        IsolationLevel::None
                    });
                info!(host = %self.config.host, database = %self.config.database, "mssql connected");
            });
        self.state.track(result)
    }

    fn disconnect(&mut self) -> Result<(), DbConnError> {
        let result = self.close_session();
        self.state.track(result)
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn begin_trans(&mut self) -> Result<(), DbConnError> {
        let result = self
            .state
            .check_can_begin()
            .and_then(|()| self.batch(DIALECT.begin_sql()));
        if result.is_ok() {
            self.state.in_transaction = true;
        }
        self.state.track(result)
    }

    fn commit(&mut self) -> Result<(), DbConnError> {
        let result = self
            .state
            .check_can_end("commit")
            .and_then(|()| self.end_transaction(DIALECT.commit_sql()));
        self.state.track(result)
    }

    fn rollback(&mut self) -> Result<(), DbConnError> {
        let result = self
            .state
            .check_can_end("rollback")
            .and_then(|()| self.end_transaction(DIALECT.rollback_sql()));
        self.state.track(result)
    }

    fn exec_sql(&mut self, sql: &str) -> Result<u64, DbConnError> {
        debug!(sql, "mssql execute");
        let result = if must_run_alone(sql) {
            self.batch(sql).map(|()| 0)
        } else {
            self.counted_batch(sql)
        };
        if let Ok(rows) = result {
            self.state.rows_affected = rows;
        }
        self.state.track(result)
    }

    fn get_cursor(
        &mut self,
        sql: &str,
        shape: Option<FetchShape>,
        _fetch_all: bool,
    ) -> Result<Box<dyn Cursor + '_>, DbConnError> {
        let shape = shape.unwrap_or(self.config.default_fetch_shape);
        let Self {
            runtime,
            client,
            state,
            ..
        } = self;
        let Some(client) = client.as_mut() else {
            return state.track(Err(DbConnError::NotConnected));
        };
        let cursor = MssqlCursor::open(runtime, client, state, sql, shape)?;
        Ok(Box::new(cursor))
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement + '_>, DbConnError> {
        let Self {
            runtime,
            client,
            state,
            ..
        } = self;
        let Some(client) = client.as_mut() else {
            return state.track(Err(DbConnError::NotConnected));
        };
        Ok(Box::new(MssqlStatement::new(runtime, client, state, sql)))
    }

    fn get_last_key(&mut self) -> Result<i64, DbConnError> {
        let result = self.scalar(LAST_KEY_SQL).and_then(|v| {
            v.to_i64()
                .ok_or_else(|| DbConnError::NoResult("no identity value generated".to_string()))
        });
        self.state.track(result)
    }

    fn set_transaction_isolation(&mut self, level: IsolationLevel) -> Result<(), DbConnError> {
        let result = DIALECT
            .isolation_sql(level)
            .and_then(|sql| self.batch(&sql));
        if result.is_ok() {
            self.state.isolation = level;
        }
        self.state.track(result)
    }

    fn set_end_method(&mut self, end_method: EndMethod) {
        self.state.end_method = end_method;
    }
}

impl Drop for MssqlConnection {
    fn drop(&mut self) {
        if let Err(e) = self.close_session() {
            warn!(error = %e, "mssql session did not close cleanly");
        }
    }
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("host", &self.config.host)
            .field("database", &self.config.database)
            .field("connected", &self.client.is_some())
            .field("state", &self.state)
            .finish()
    }
}
