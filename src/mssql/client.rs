use tiberius::{AuthMethod, Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::DbConnError;

/// Type alias for SQL Server client
pub(crate) type MssqlClient = Client<Compat<TcpStream>>;

pub(super) fn build_tiberius_config(config: &ConnectionConfig) -> Config {
    let mut tds = Config::new();
    tds.host(&config.host);
    tds.database(&config.database);
    tds.port(config.port_or_default());
    tds.authentication(AuthMethod::sql_server(&config.user, &config.password));
    if let Some(instance) = &config.instance_name {
        tds.instance_name(instance);
    }
    if config.trust_cert {
        tds.trust_cert();
    }
    tds
}

/// Open a TDS session. Named instances are located through the SQL Browser service.
///
/// # Errors
/// Returns `DbConnError::ConnectionError` if the server cannot be reached or rejects the
/// login.
pub(super) async fn create_mssql_client(
    config: &ConnectionConfig,
) -> Result<MssqlClient, DbConnError> {
    let tds = build_tiberius_config(config);
    let target = format!("{}:{}", config.host, config.port_or_default());

    let tcp = if config.instance_name.is_some() {
        TcpStream::connect_named(&tds).await.map_err(|e| {
            DbConnError::ConnectionError(format!("SQL Browser lookup for {target} failed: {e}"))
        })?
    } else {
        TcpStream::connect(tds.get_addr())
            .await
            .map_err(|e| DbConnError::ConnectionError(format!("TCP connection to {target}: {e}")))?
    };
    tcp.set_nodelay(true)?;
    debug!(%target, "mssql tcp connected");

    Client::connect(tds, tcp.compat_write())
        .await
        .map_err(|e| DbConnError::ConnectionError(format!("SQL Server login at {target}: {e}")))
}
