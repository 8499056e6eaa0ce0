//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and traits
//! to make it easier to get started with the library.

pub use crate::config::{ConfigFile, ConnectionConfig, ConnectionConfigBuilder, SettingsTable};
pub use crate::connection::Connection;
pub use crate::cursor::Cursor;
pub use crate::dialect::{Dialect, MergeRequest, MergeSource};
pub use crate::error::DbConnError;
pub use crate::functions::{CastType, DatePart, Functions};
pub use crate::registry::ConnectorRegistry;
pub use crate::results::{CustomDbRow, DataRow, FieldInfo};
pub use crate::statement::Statement;
pub use crate::types::{DatabaseType, EndMethod, FetchShape, IsolationLevel, RowValues};

#[cfg(feature = "mssql")]
pub use crate::mssql::MssqlConnection;
#[cfg(feature = "mysql")]
pub use crate::mysql::MysqlConnection;
