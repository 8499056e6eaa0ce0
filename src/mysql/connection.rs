use mysql_async::Conn;
use mysql_async::prelude::Queryable;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use super::config::build_opts;
use super::cursor::MysqlCursor;
use super::statement::MysqlStatement;
use crate::config::ConnectionConfig;
use crate::connection::{Connection, ConnectionState, end_transaction_sql};
use crate::cursor::Cursor;
use crate::dialect::{Dialect, MysqlDialect};
use crate::error::DbConnError;
use crate::statement::Statement;
use crate::types::{EndMethod, FetchShape, IsolationLevel, RowValues};

/// Servers before 8.0 only know the old name of the variable.
const LEGACY_ISOLATION_SQL: &str = "SELECT @@tx_isolation";

const SQL_MODE_SQL: &str = "SELECT @@SESSION.sql_mode";

static DIALECT: MysqlDialect = MysqlDialect::new();
static NO_BACKSLASH_DIALECT: MysqlDialect = MysqlDialect::without_backslash_escapes();

/// Whether a `sql_mode` value turns backslashes into ordinary characters.
fn disables_backslash_escapes(sql_mode: &str) -> bool {
    sql_mode
        .split(',')
        .any(|mode| mode.trim().eq_ignore_ascii_case("NO_BACKSLASH_ESCAPES"))
}

/// A blocking MySQL / MariaDB session.
///
/// Each connection drives its own single-threaded runtime, so it can be used from plain
/// synchronous code.
pub struct MysqlConnection {
    config: ConnectionConfig,
    runtime: Runtime,
    conn: Option<Conn>,
    state: ConnectionState,
    no_backslash_escapes: bool,
}

impl MysqlConnection {
    /// A disconnected session for `config`.
    ///
    /// # Errors
    /// Returns `DbConnError::ConfigError` if `config` is not for MySQL, or
    /// `DbConnError::ConnectionError` if the runtime cannot be started.
    pub fn new(config: ConnectionConfig) -> Result<Self, DbConnError> {
        if config.driver != crate::types::DatabaseType::Mysql {
            return Err(DbConnError::ConfigError(format!(
                "{} settings given to the mysql driver",
                config.driver.as_str()
            )));
        }
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let state = ConnectionState::new(config.end_method);
        Ok(Self {
            config,
            runtime,
            conn: None,
            state,
            no_backslash_escapes: false,
        })
    }

    /// Create and connect.
    ///
    /// # Errors
    /// See [`MysqlConnection::new`] and [`Connection::connect`].
    pub fn open(config: ConnectionConfig) -> Result<Self, DbConnError> {
        let mut conn = Self::new(config)?;
        conn.connect()?;
        Ok(conn)
    }

    /// Run a statement, discarding any result.
    fn batch(&mut self, sql: &str) -> Result<(), DbConnError> {
        debug!(sql, "mysql batch");
        let conn = self.conn.as_mut().ok_or(DbConnError::NotConnected)?;
        self.runtime.block_on(conn.query_drop(sql))?;
        Ok(())
    }

    fn read_isolation(&mut self) -> Result<IsolationLevel, DbConnError> {
        let conn = self.conn.as_mut().ok_or(DbConnError::NotConnected)?;
        let value = match self
            .runtime
            .block_on(conn.query_first::<String, _>(DIALECT.read_isolation_sql()))
        {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "falling back to tx_isolation");
                self.runtime
                    .block_on(conn.query_first::<String, _>(LEGACY_ISOLATION_SQL))?
            }
        };
        Ok(value.map_or(IsolationLevel::RepeatableRead, |v| {
            DIALECT.parse_isolation(&RowValues::Text(v))
        }))
    }

    /// Pick the string escaping that matches the session's `sql_mode`.
    fn refresh_escaping(&mut self) {
        let Some(conn) = self.conn.as_mut() else {
            return;
        };
        match self
            .runtime
            .block_on(conn.query_first::<String, _>(SQL_MODE_SQL))
        {
            Ok(mode) => {
                self.no_backslash_escapes = mode.as_deref().is_some_and(disables_backslash_escapes);
                debug!(no_backslash_escapes = self.no_backslash_escapes, "mysql sql_mode read");
            }
            Err(e) => warn!(error = %e, "could not read the session sql_mode"),
        }
    }

    fn end_transaction(&mut self, sql: &str) -> Result<(), DbConnError> {
        let result = self.batch(sql);
        self.state.in_transaction = false;
        result
    }

    fn close_session(&mut self) -> Result<(), DbConnError> {
        let Some(mut conn) = self.conn.take() else {
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
                Some(sql) => conn.query_drop(sql).await,
                None => Ok(()),
            };
            let closed = conn.disconnect().await;
            ended.and(closed)
        })?;
        info!(host = %self.config.host, "mysql disconnected");
        Ok(())
    }
}

impl Connection for MysqlConnection {
    fn dialect(&self) -> &'static dyn Dialect {
        if self.no_backslash_escapes {
            &NO_BACKSLASH_DIALECT
        } else {
            &DIALECT
        }
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn state(&self) -> &ConnectionState {
        &self.state
    }

    fn connect(&mut self) -> Result<(), DbConnError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let opts = build_opts(&self.config);
        let result = self.runtime.block_on(Conn::new(opts)).map_err(|e| {
            DbConnError::ConnectionError(format!(
                "mysql {}:{}: {e}",
                self.config.host,
                self.config.port_or_default()
            ))
        });
        let result = result.map(|conn| {
            self.conn = Some(conn);
            self.state.in_transaction = false;
            self.state.isolation = self.read_isolation().unwrap_or_else(|e| {
                warn!(error = %e, "could not read the session isolation level");
                IsolationLevel::None
            });
            self.refresh_escaping();
            info!(host = %self.config.host, database = %self.config.database, "mysql connected");
        });
        self.state.track(result)
    }

    fn disconnect(&mut self) -> Result<(), DbConnError> {
        let result = self.close_session();
        self.state.track(result)
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
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
        let result = self.batch(sql).and_then(|()| {
            let conn = self.conn.as_ref().ok_or(DbConnError::NotConnected)?;
            Ok(conn.affected_rows())
        });
        if let Ok(rows) = result {
            self.state.rows_affected = rows;
            if sql.to_ascii_lowercase().contains("sql_mode") {
                self.refresh_escaping();
            }
        }
        self.state.track(result)
    }

    fn get_cursor(
        &mut self,
        sql: &str,
        shape: Option<FetchShape>,
        fetch_all: bool,
    ) -> Result<Box<dyn Cursor + '_>, DbConnError> {
        let shape = shape.unwrap_or(self.config.default_fetch_shape);
        let Self {
            runtime,
            conn,
            state,
            ..
        } = self;
        let Some(conn) = conn.as_mut() else {
            return state.track(Err(DbConnError::NotConnected));
        };
        let cursor = MysqlCursor::open(runtime, conn, state, sql, shape, fetch_all)?;
        Ok(Box::new(cursor))
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement + '_>, DbConnError> {
        let Self {
            runtime,
            conn,
            state,
            ..
        } = self;
        let Some(conn) = conn.as_mut() else {
            return state.track(Err(DbConnError::NotConnected));
        };
        let statement = MysqlStatement::prepare(runtime, conn, state, sql)?;
        Ok(Box::new(statement))
    }

    fn get_last_key(&mut self) -> Result<i64, DbConnError> {
        let result = self
            .conn
            .as_ref()
            .ok_or(DbConnError::NotConnected)
            .and_then(|conn| {
                conn.last_insert_id()
                    .and_then(|id| i64::try_from(id).ok())
                    .ok_or_else(|| DbConnError::NoResult("no auto-increment key generated".to_string()))
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

impl Drop for MysqlConnection {
    fn drop(&mut self) {
        if let Err(e) = self.close_session() {
            warn!(error = %e, "mysql session did not close cleanly");
        }
    }
}

impl std::fmt::Debug for MysqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlConnection")
            .field("host", &self.config.host)
            .field("database", &self.config.database)
            .field("connected", &self.conn.is_some())
            .field("state", &self.state)
            .finish()
    }
}
