//! SQL text generation that differs between backends.
//!
//! A [`Dialect`] is pure: it never touches a session, so everything here can be used (and
//! tested) without a server. Connections hand out their dialect through
//! [`crate::Connection::dialect`].

use crate::error::DbConnError;
use crate::functions::Functions;
use crate::placeholders::Flavor;
use crate::types::{DatabaseType, IsolationLevel, RowValues};

pub mod merge;
mod mssql;
mod mysql;

pub use merge::{MergeRequest, MergeSource};
pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;

/// Backend-specific SQL syntax.
pub trait Dialect: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Lexical rules used when scanning statements for placeholders.
    fn flavor(&self) -> Flavor;

    /// Escape `s` for use inside a single-quoted literal.
    fn escape_str(&self, s: &str) -> String;

    /// Wrap an already escaped string in quotes.
    fn quoted_str(&self, s: &str) -> String {
        format!("'{s}'")
    }

    /// Quoted, escaped literal for text.
    fn text_literal(&self, s: &str) -> String {
        self.quoted_str(&self.escape_str(s))
    }

    /// Literal for raw bytes.
    fn binary_literal(&self, bytes: &[u8]) -> String;

    /// Restrict `sql` to `limit` rows, skipping `offset` rows first. An offset of 0 is the
    /// same as none.
    fn limit(&self, sql: &str, limit: u64, offset: Option<u64>) -> String;

    /// Render an upsert.
    ///
    /// # Errors
    /// Returns `DbConnError::ParameterError` when the key or field lists are empty, a key is
    /// not one of the fields, or an update-only merge has nothing to update.
    fn merge(&self, request: &MergeRequest<'_>) -> Result<String, DbConnError>;

    fn begin_sql(&self) -> &'static str;

    fn commit_sql(&self) -> &'static str;

    fn rollback_sql(&self) -> &'static str;

    /// Statement that changes the session's isolation level.
    ///
    /// # Errors
    /// Returns `DbConnError::TransactionError` for [`IsolationLevel::None`], which no
    /// statement can express.
    fn isolation_sql(&self, level: IsolationLevel) -> Result<String, DbConnError>;

    /// Query that reads the session's isolation level.
    fn read_isolation_sql(&self) -> &'static str;

    /// Map the value returned by [`Dialect::read_isolation_sql`] to a level.
    fn parse_isolation(&self, value: &RowValues) -> IsolationLevel;

    /// `max(field) + increment` over `source`, 0 standing in for an empty table.
    fn next_key_sql(&self, source: &str, increment: i64, field: &str) -> String;

    fn functions(&self) -> &'static dyn Functions;
}

pub(crate) fn no_isolation_keyword() -> DbConnError {
    DbConnError::TransactionError("isolation level None cannot be set explicitly".to_string())
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02X}");
        s
    })
}
