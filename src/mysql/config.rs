use mysql_async::{Opts, OptsBuilder};

use crate::config::ConnectionConfig;

/// Driver options for a MySQL session.
pub(super) fn build_opts(config: &ConnectionConfig) -> Opts {
    let password = (!config.password.is_empty()).then(|| config.password.clone());
    OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port_or_default())
        .db_name(Some(config.database.clone()))
        .user(Some(config.user.clone()))
        .pass(password)
        .into()
}
