//! Driver lookup by name.

use indexmap::IndexMap;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::DbConnError;

/// Builds a disconnected [`Connection`] from its settings.
pub type ConnectorFn = fn(ConnectionConfig) -> Result<Box<dyn Connection>, DbConnError>;

/// Maps driver identifiers (`"mysql"`, `"mssql"`) to connection factories.
///
/// [`ConnectorRegistry::default`] holds the drivers compiled into the crate; further
/// entries can be added or replaced with [`ConnectorRegistry::register`].
#[derive(Debug, Clone)]
pub struct ConnectorRegistry {
    factories: IndexMap<String, ConnectorFn>,
}

#[cfg(feature = "mysql")]
fn mysql_connector(config: ConnectionConfig) -> Result<Box<dyn Connection>, DbConnError> {
    Ok(Box::new(crate::mysql::MysqlConnection::new(config)?))
}

#[cfg(feature = "mssql")]
fn mssql_connector(config: ConnectionConfig) -> Result<Box<dyn Connection>, DbConnError> {
    Ok(Box::new(crate::mssql::MssqlConnection::new(config)?))
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "mysql")]
        registry.register(crate::types::DatabaseType::Mysql.as_str(), mysql_connector);
        #[cfg(feature = "mssql")]
        registry.register(crate::types::DatabaseType::Mssql.as_str(), mssql_connector);
        registry
    }
}

impl ConnectorRegistry {
    /// A registry without drivers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Add or replace the factory for `name`, returning the one it replaced.
    pub fn register(&mut self, name: impl Into<String>, factory: ConnectorFn) -> Option<ConnectorFn> {
        self.factories.insert(name.into(), factory)
    }

    /// Registered driver names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a disconnected connection for `config.driver`.
    ///
    /// # Errors
    /// Returns `DbConnError::ConfigError` if no factory is registered for the driver, or
    /// the factory's error.
    pub fn create(&self, config: ConnectionConfig) -> Result<Box<dyn Connection>, DbConnError> {
        let name = config.driver.as_str();
        let factory = self.factories.get(name).ok_or_else(|| {
            DbConnError::ConfigError(format!("no connector registered for driver `{name}`"))
        })?;
        debug!(driver = name, host = %config.host, "creating connection");
        factory(config)
    }

    /// Build and connect.
    ///
    /// # Errors
    /// See [`ConnectorRegistry::create`] and [`Connection::connect`].
    pub fn connect(&self, config: ConnectionConfig) -> Result<Box<dyn Connection>, DbConnError> {
        let mut conn = self.create(config)?;
        conn.connect()?;
        Ok(conn)
    }
}
