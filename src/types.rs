use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row, formatted as SQL literals, or bound to a
/// prepared statement.
///
/// The same enum is used by every backend so callers never branch on driver types:
/// ```rust
/// use dbconn::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Zero-length text or binary data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            RowValues::Text(s) => s.is_empty(),
            RowValues::Blob(b) => b.is_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Read the value as an integer, parsing text and truncating floats.
    ///
    /// Backends that talk the text protocol hand numbers back as strings, so key lookups
    /// go through this instead of [`RowValues::as_int`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            RowValues::Int(i) => Some(*i),
            RowValues::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            RowValues::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
            RowValues::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// The database type supported by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// MySQL / MariaDB
    Mysql,
    /// SQL Server
    Mssql,
}

impl DatabaseType {
    /// Identifier used by the connector registry.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseType::Mysql => "mysql",
            DatabaseType::Mssql => "mssql",
        }
    }

    /// Port used when the configuration does not name one.
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            DatabaseType::Mysql => 3306,
            DatabaseType::Mssql => 1433,
        }
    }
}

/// How a fetched row is keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchShape {
    /// Positional values only.
    Numeric,
    /// Column name to value.
    #[default]
    Named,
    /// Both positional and by-name access.
    Both,
}

/// Transaction isolation level of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    #[default]
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Keyword form used by `SET ... TRANSACTION ISOLATION LEVEL`.
    #[must_use]
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            IsolationLevel::None => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

/// What happens to an open transaction when the connection is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndMethod {
    /// Leave it to the server (an abandoned session rolls back).
    #[default]
    Default,
    Commit,
    Rollback,
}
