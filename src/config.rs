//! Connection settings.
//!
//! A [`ConnectionConfig`] is a plain value: build one in code with
//! [`ConnectionConfigBuilder`] or load a set of named ones from a JSON [`ConfigFile`]:
//! ```json
//! {
//!   "connections": {
//!     "main":    { "driver": "mysql", "host": "db1", "database": "app", "user": "app", "password": "..." },
//!     "billing": { "driver": "mssql", "host": "db2", "port": 1433, "database": "billing",
//!                  "user": "sa", "password": "...", "end_method": "commit" }
//!   }
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::DbConnError;
use crate::types::{DatabaseType, EndMethod, FetchShape};

/// Key/value table used by [`crate::Connection::get_value`] and
/// [`crate::Connection::set_value`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsTable {
    pub table: String,
    pub key_column: String,
    pub value_column: String,
}

impl Default for SettingsTable {
    fn default() -> Self {
        Self {
            table: "settings".to_string(),
            key_column: "setting_key".to_string(),
            value_column: "setting_value".to_string(),
        }
    }
}

fn default_trust_cert() -> bool {
    true
}

/// Everything needed to open a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub driver: DatabaseType,
    pub host: String,
    /// Falls back to [`DatabaseType::default_port`].
    #[serde(default)]
    pub port: Option<u16>,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// SQL Server named instance, resolved through the SQL Browser service.
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Accept the SQL Server certificate without validation.
    #[serde(default = "default_trust_cert")]
    pub trust_cert: bool,
    #[serde(default)]
    pub default_fetch_shape: FetchShape,
    #[serde(default)]
    pub end_method: EndMethod,
    #[serde(default)]
    pub settings: SettingsTable,
}

impl ConnectionConfig {
    #[must_use]
    pub fn builder(
        driver: DatabaseType,
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new(driver, host, database, user, password)
    }

    /// Port to dial, explicit or the driver default.
    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| self.driver.default_port())
    }

    /// Parse a single connection from JSON.
    ///
    /// # Errors
    /// Returns `DbConnError::ConfigError` if the document does not describe a connection.
    pub fn from_json(json: &str) -> Result<Self, DbConnError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `DbConnError::ConfigError` when the host, database or user is blank.
    pub fn validate(&self) -> Result<(), DbConnError> {
        for (name, value) in [
            ("host", &self.host),
            ("database", &self.database),
            ("user", &self.user),
        ] {
            if value.trim().is_empty() {
                return Err(DbConnError::ConfigError(format!(
                    "{} connection needs a {name}",
                    self.driver.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// Fluent builder for [`ConnectionConfig`].
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    #[must_use]
    pub fn new(
        driver: DatabaseType,
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            config: ConnectionConfig {
                driver,
                host: host.into(),
                port: None,
                database: database.into(),
                user: user.into(),
                password: password.into(),
                instance_name: None,
                trust_cert: default_trust_cert(),
                default_fetch_shape: FetchShape::default(),
                end_method: EndMethod::default(),
                settings: SettingsTable::default(),
            },
        }
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.config.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn trust_cert(mut self, trust_cert: bool) -> Self {
        self.config.trust_cert = trust_cert;
        self
    }

    #[must_use]
    pub fn default_fetch_shape(mut self, shape: FetchShape) -> Self {
        self.config.default_fetch_shape = shape;
        self
    }

    #[must_use]
    pub fn end_method(mut self, end_method: EndMethod) -> Self {
        self.config.end_method = end_method;
        self
    }

    #[must_use]
    pub fn settings_table(mut self, settings: SettingsTable) -> Self {
        self.config.settings = settings;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionConfig {
        self.config
    }

    /// Validate the settings and open a session with the default registry.
    ///
    /// # Errors
    /// Returns `DbConnError::ConfigError` for incomplete settings or an unavailable driver,
    /// and any error raised while connecting.
    pub fn connect(self) -> Result<Box<dyn crate::Connection>, DbConnError> {
        let config = self.finish();
        config.validate()?;
        crate::ConnectorRegistry::default().connect(config)
    }
}

/// Named connections loaded from a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub connections: IndexMap<String, ConnectionConfig>,
}

impl ConfigFile {
    /// # Errors
    /// Returns `DbConnError::ConfigError` for malformed JSON or an invalid connection entry.
    pub fn from_json(json: &str) -> Result<Self, DbConnError> {
        let file: Self = serde_json::from_str(json)?;
        for (name, config) in &file.connections {
            config.validate().map_err(|e| {
                DbConnError::ConfigError(format!("connection `{name}`: {e}"))
            })?;
        }
        Ok(file)
    }

    /// # Errors
    /// Returns `DbConnError::ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DbConnError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DbConnError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// # Errors
    /// Returns `DbConnError::ConfigError` if no connection has that name.
    pub fn connection(&self, name: &str) -> Result<&ConnectionConfig, DbConnError> {
        self.connections
            .get(name)
            .ok_or_else(|| DbConnError::ConfigError(format!("no connection named `{name}`")))
    }

    /// Connection names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }
}
