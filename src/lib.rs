//! Blocking, dialect-aware database connections for MySQL and SQL Server.
//!
//! A [`Connection`] owns one server session. It runs statements, opens [`Cursor`]s and
//! prepared [`Statement`]s, controls transactions, and renders dialect-specific SQL:
//! literals through the value formatter, upserts, row limits and portable function calls.
//!
//! ```rust,no_run
//! use dbconn::prelude::*;
//!
//! # fn main() -> Result<(), DbConnError> {
//! let mut conn = ConnectionConfig::builder(DatabaseType::Mysql, "localhost", "app", "app", "secret")
//!     .end_method(EndMethod::Rollback)
//!     .connect()?;
//!
//! conn.begin_trans()?;
//! let name = conn.format(&RowValues::from("O'Brien"), true, None)?;
//! conn.exec_sql(&format!("INSERT INTO people( name ) VALUES( {name} )"))?;
//! let id = conn.get_last_key()?;
//! conn.commit()?;
//!
//! let sql = conn.limit("SELECT id, name FROM people ORDER BY id", 10, None);
//! for row in conn.get_data_packet(&sql, true)? {
//!     println!("{:?} {:?}", row.get("id"), row.get("name"));
//! }
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod cursor;
pub mod dialect;
pub mod error;
pub mod format;
pub mod functions;
pub mod placeholders;
pub mod prelude;
pub mod printf;
pub mod registry;
pub mod results;
pub mod statement;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;

pub use config::{ConfigFile, ConnectionConfig, ConnectionConfigBuilder, SettingsTable};
pub use connection::{Connection, ConnectionState};
pub use cursor::Cursor;
pub use error::DbConnError;
pub use registry::ConnectorRegistry;
pub use statement::{BindValue, Statement};
pub use types::{DatabaseType, EndMethod, FetchShape, IsolationLevel, RowValues};
