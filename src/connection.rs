//! The contract every backend session implements.

use tracing::debug;

use crate::config::ConnectionConfig;
use crate::cursor::Cursor;
use crate::dialect::{Dialect, MergeRequest};
use crate::error::DbConnError;
use crate::format;
use crate::functions::Functions;
use crate::results::DataRow;
use crate::statement::Statement;
use crate::types::{EndMethod, FetchShape, IsolationLevel, RowValues};

/// Session bookkeeping shared by the drivers.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub(crate) in_transaction: bool,
    pub(crate) isolation: IsolationLevel,
    pub(crate) end_method: EndMethod,
    pub(crate) rows_affected: u64,
    pub(crate) last_error: Option<String>,
}

impl ConnectionState {
    pub(crate) fn new(end_method: EndMethod) -> Self {
        Self {
            end_method,
            ..Self::default()
        }
    }

    /// Remember the outcome of a session operation for [`Connection::last_error`].
    pub(crate) fn track<T>(&mut self, result: Result<T, DbConnError>) -> Result<T, DbConnError> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => {
                debug!(error = %e, "database operation failed");
                self.last_error = Some(e.to_string());
            }
        }
        result
    }

    pub(crate) fn check_can_begin(&self) -> Result<(), DbConnError> {
        if self.in_transaction {
            return Err(DbConnError::TransactionError(
                "a transaction is already active".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_can_end(&self, action: &str) -> Result<(), DbConnError> {
        if !self.in_transaction {
            return Err(DbConnError::TransactionError(format!(
                "cannot {action}: no active transaction"
            )));
        }
        Ok(())
    }
}

/// Statement that resolves an open transaction per `end_method`. `None` leaves the
/// transaction to the server, which rolls it back when the session ends.
pub(crate) fn end_transaction_sql(dialect: &dyn Dialect, end_method: EndMethod) -> Option<&'static str> {
    match end_method {
        EndMethod::Default => None,
        EndMethod::Commit => Some(dialect.commit_sql()),
        EndMethod::Rollback => Some(dialect.rollback_sql()),
    }
}

/// A session with one database server.
///
/// Connections start disconnected. Cursors and prepared statements borrow the connection
/// mutably and must be dropped before it is used again. Dropping a connected connection
/// resolves an open transaction per its [`EndMethod`] and closes the session.
///
/// Session operations record their failure text for [`Connection::last_error`] and clear it
/// on success.
pub trait Connection: Send {
    fn dialect(&self) -> &'static dyn Dialect;

    fn config(&self) -> &ConnectionConfig;

    fn state(&self) -> &ConnectionState;

    /// # Errors
    /// Returns `DbConnError::ConnectionError` (or the driver error) if the session cannot be
    /// opened.
    fn connect(&mut self) -> Result<(), DbConnError>;

    /// Resolve an open transaction per the end method, then close the session. Does nothing
    /// when not connected.
    ///
    /// # Errors
    /// Returns the driver error if resolving the transaction or closing fails. The session
    /// is released either way.
    fn disconnect(&mut self) -> Result<(), DbConnError>;

    fn is_connected(&self) -> bool;

    /// # Errors
    /// Returns `DbConnError::TransactionError` if a transaction is already active.
    fn begin_trans(&mut self) -> Result<(), DbConnError>;

    /// # Errors
    /// Returns `DbConnError::TransactionError` without an active transaction.
    fn commit(&mut self) -> Result<(), DbConnError>;

    /// # Errors
    /// Returns `DbConnError::TransactionError` without an active transaction.
    fn rollback(&mut self) -> Result<(), DbConnError>;

    /// Run a statement that returns no rows; returns the rows affected.
    ///
    /// # Errors
    /// Returns `DbConnError::NotConnected` or the driver error.
    fn exec_sql(&mut self, sql: &str) -> Result<u64, DbConnError>;

    /// Run a query and open a cursor over its rows. `shape` of `None` uses the
    /// configured default; `fetch_all` reads the whole result up front.
    ///
    /// # Errors
    /// Returns `DbConnError::NotConnected` or the driver error.
    fn get_cursor(
        &mut self,
        sql: &str,
        shape: Option<FetchShape>,
        fetch_all: bool,
    ) -> Result<Box<dyn Cursor + '_>, DbConnError>;

    /// # Errors
    /// Returns `DbConnError::NotConnected` or the driver error.
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement + '_>, DbConnError>;

    /// Key generated by the last insert into an auto-increment / identity column.
    ///
    /// # Errors
    /// Returns `DbConnError::NoResult` when no key was generated.
    fn get_last_key(&mut self) -> Result<i64, DbConnError>;

    /// # Errors
    /// Returns `DbConnError::TransactionError` for [`IsolationLevel::None`], or the driver
    /// error. The recorded level only changes on success.
    fn set_transaction_isolation(&mut self, level: IsolationLevel) -> Result<(), DbConnError>;

    /// Rows affected by the last [`Connection::exec_sql`].
    fn get_rows_affected(&self) -> u64 {
        self.state().rows_affected
    }

    fn last_error(&self) -> Option<&str> {
        self.state().last_error.as_deref()
    }

    fn in_transaction(&self) -> bool {
        self.state().in_transaction
    }

    fn transaction_isolation(&self) -> IsolationLevel {
        self.state().isolation
    }

    fn end_method(&self) -> EndMethod {
        self.state().end_method
    }

    fn set_end_method(&mut self, end_method: EndMethod);

    fn get_functions(&self) -> &'static dyn Functions {
        self.dialect().functions()
    }

    /// See [`format::format_value`].
    ///
    /// # Errors
    /// Returns `DbConnError::ParameterError` for an invalid format spec.
    fn format(
        &self,
        value: &RowValues,
        null_if_empty: bool,
        fmt: Option<&str>,
    ) -> Result<String, DbConnError> {
        format::format_value(self.dialect(), value, null_if_empty, fmt)
    }

    /// # Errors
    /// Returns `DbConnError::ParameterError` for an invalid value.
    fn format_all(&self, values: &[RowValues]) -> Result<String, DbConnError> {
        format::format_all(self.dialect(), values)
    }

    /// # Errors
    /// Returns `DbConnError::ParameterError` for an invalid format spec.
    fn format_cond(
        &self,
        value: &RowValues,
        op: &str,
        null_if_empty: bool,
        fmt: Option<&str>,
    ) -> Result<String, DbConnError> {
        format::format_cond(self.dialect(), value, op, null_if_empty, fmt)
    }

    fn limit(&self, sql: &str, limit: u64, offset: Option<u64>) -> String {
        self.dialect().limit(sql, limit, offset)
    }

    /// Upsert the rows returned by `select` into `table`.
    ///
    /// # Errors
    /// Returns `DbConnError::ParameterError` for unusable key or field lists.
    fn get_merge_select(
        &self,
        table: &str,
        keys: &str,
        fields: &str,
        select: &str,
        ignore_insert: bool,
        on_update: Option<&str>,
    ) -> Result<String, DbConnError> {
        let mut request = MergeRequest::select(table, keys, fields, select).ignore_insert(ignore_insert);
        request.on_update = on_update;
        self.dialect().merge(&request)
    }

    /// Upsert literal tuples into `table`.
    ///
    /// # Errors
    /// Returns `DbConnError::ParameterError` for unusable key, field or value lists.
    fn get_merge_values(
        &self,
        table: &str,
        keys: &str,
        fields: &str,
        values: &[&str],
        ignore_insert: bool,
        on_update: Option<&str>,
    ) -> Result<String, DbConnError> {
        let mut request = MergeRequest::values(table, keys, fields, values).ignore_insert(ignore_insert);
        request.on_update = on_update;
        self.dialect().merge(&request)
    }

    /// First row of `sql`, keyed by name when `assoc` is set.
    ///
    /// # Errors
    /// Returns the error of opening or reading the cursor.
    fn get_data_row(&mut self, sql: &str, assoc: bool) -> Result<Option<DataRow>, DbConnError> {
        let shape = if assoc { FetchShape::Named } else { FetchShape::Numeric };
        let mut cursor = self.get_cursor(sql, Some(shape), false)?;
        let row = cursor.next(None)?;
        cursor.close()?;
        Ok(row)
    }

    /// Every row of `sql`, keyed by name when `assoc` is set.
    ///
    /// # Errors
    /// Returns the error of opening or reading the cursor.
    fn get_data_packet(&mut self, sql: &str, assoc: bool) -> Result<Vec<DataRow>, DbConnError> {
        let shape = if assoc { FetchShape::Named } else { FetchShape::Numeric };
        let mut cursor = self.get_cursor(sql, Some(shape), true)?;
        let mut rows = Vec::with_capacity(usize::try_from(cursor.num_rows()).unwrap_or(0));
        while let Some(row) = cursor.next(None)? {
            rows.push(row);
        }
        cursor.close()?;
        Ok(rows)
    }

    /// One value from the first row: column `field`, or the first column when `None`.
    /// `Ok(None)` when the query returns no rows.
    ///
    /// # Errors
    /// Returns `DbConnError::NoResult` if the row has no such column.
    fn get_field(&mut self, sql: &str, field: Option<&str>) -> Result<Option<RowValues>, DbConnError> {
        let Some(row) = self.get_data_row(sql, field.is_some())? else {
            return Ok(None);
        };
        let value = match field {
            Some(name) => row.get(name),
            None => row.get_by_index(0),
        };
        match value {
            Some(v) => Ok(Some(v.clone())),
            None => Err(DbConnError::NoResult(format!(
                "column {} not in result of `{sql}`",
                field.unwrap_or("0")
            ))),
        }
    }

    /// Value stored under `key` in the settings table.
    ///
    /// # Errors
    /// Returns the error of the underlying query.
    fn get_value(&mut self, key: &str) -> Result<Option<RowValues>, DbConnError> {
        let settings = &self.config().settings;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            settings.value_column,
            settings.table,
            settings.key_column,
            self.format(&RowValues::from(key), false, None)?
        );
        self.get_field(&sql, None)
    }

    /// Store `value` under `key` in the settings table; a NULL value deletes the key.
    ///
    /// # Errors
    /// Returns the error of the underlying statement.
    fn set_value(&mut self, key: &str, value: &RowValues) -> Result<u64, DbConnError> {
        let settings = self.config().settings.clone();
        let key = RowValues::from(key);
        let sql = if value.is_null() {
            format!(
                "DELETE FROM {} WHERE {} = {}",
                settings.table,
                settings.key_column,
                self.format(&key, false, None)?
            )
        } else {
            let fields = format!("{},{}", settings.key_column, settings.value_column);
            let tuple = self.format_all(&[key, value.clone()])?;
            self.get_merge_values(
                &settings.table,
                &settings.key_column,
                &fields,
                &[tuple.as_str()],
                false,
                None,
            )?
        };
        self.exec_sql(&sql)
    }

    /// `max(field) + increment` over `source`, or `increment` for an empty source.
    /// Concurrent callers can receive the same key.
    ///
    /// # Errors
    /// Returns `DbConnError::NoResult` if the query yields no number.
    fn get_next_key(&mut self, source: &str, increment: i64, field: &str) -> Result<i64, DbConnError> {
        let sql = self.dialect().next_key_sql(source, increment, field);
        self.get_field(&sql, None)?
            .as_ref()
            .and_then(RowValues::to_i64)
            .ok_or_else(|| DbConnError::NoResult(format!("no key from `{sql}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MssqlDialect, MysqlDialect};

    #[test]
    fn transaction_rules() {
        let mut state = ConnectionState::new(EndMethod::Commit);
        assert!(state.check_can_begin().is_ok());
        assert!(matches!(
            state.check_can_end("commit"),
            Err(DbConnError::TransactionError(_))
        ));
        state.in_transaction = true;
        assert!(state.check_can_begin().is_err());
        assert!(state.check_can_end("rollback").is_ok());
    }

    #[test]
    fn tracks_last_error() {
        let mut state = ConnectionState::default();
        let failed: Result<(), _> = state.track(Err(DbConnError::NotConnected));
        assert!(failed.is_err());
        assert_eq!(state.last_error.as_deref(), Some("Not connected"));
        let _ = state.track(Ok(1));
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn end_method_statements() {
        assert_eq!(end_transaction_sql(&MysqlDialect::new(), EndMethod::Default), None);
        assert_eq!(end_transaction_sql(&MysqlDialect::new(), EndMethod::Commit), Some("COMMIT"));
        assert_eq!(
            end_transaction_sql(&MssqlDialect, EndMethod::Rollback),
            Some("ROLLBACK TRANSACTION")
        );
    }
}
