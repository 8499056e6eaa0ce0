use thiserror::Error;

#[cfg(feature = "mysql")]
use mysql_async;
#[cfg(feature = "mssql")]
use tiberius;

#[derive(Debug, Error)]
pub enum DbConnError {
    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MysqlError(#[from] mysql_async::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("No result: {0}")]
    NoResult(String),
}

impl From<std::io::Error> for DbConnError {
    fn from(err: std::io::Error) -> Self {
        DbConnError::ConnectionError(format!("I/O error: {err}"))
    }
}

impl From<serde_json::Error> for DbConnError {
    fn from(err: serde_json::Error) -> Self {
        DbConnError::ConfigError(format!("invalid configuration document: {err}"))
    }
}
