use tokio::runtime::Runtime;
use tracing::debug;

use super::client::MssqlClient;
use super::params::as_refs;
use crate::connection::ConnectionState;
use crate::error::DbConnError;
use crate::placeholders::{Flavor, count_placeholders, to_mssql_params};
use crate::statement::{Statement, bind_values};
use crate::types::RowValues;

/// A `?` statement for SQL Server.
///
/// Tiberius has no server-side prepared statement handle, so the SQL is rewritten to
/// `@P1..@Pn` once and every execution goes through `sp_executesql`, which lets the server
/// reuse its plan.
pub struct MssqlStatement<'a> {
    runtime: &'a Runtime,
    client: &'a mut MssqlClient,
    state: &'a mut ConnectionState,
    sql: String,
    rewritten: String,
    param_count: usize,
}

impl<'a> MssqlStatement<'a> {
    pub(crate) fn new(
        runtime: &'a Runtime,
        client: &'a mut MssqlClient,
        state: &'a mut ConnectionState,
        sql: &str,
    ) -> Self {
        let rewritten = to_mssql_params(sql).into_owned();
        let param_count = count_placeholders(sql, Flavor::Tsql);
        debug!(sql = %rewritten, param_count, "mssql prepare");
        Self {
            runtime,
            client,
            state,
            sql: sql.to_string(),
            rewritten,
            param_count,
        }
    }

    fn run(&mut self, params: &[RowValues]) -> Result<u64, DbConnError> {
        let values = bind_values(params, self.param_count)?;
        let refs = as_refs(&values);
        let result = self
            .runtime
            .block_on(self.client.execute(self.rewritten.as_str(), &refs))?;
        Ok(result.rows_affected().iter().sum())
    }
}

impl Statement for MssqlStatement<'_> {
    fn execute(&mut self, params: &[RowValues]) -> Result<u64, DbConnError> {
        let result = self.run(params);
        self.state.track(result)
    }

    fn param_count(&self) -> usize {
        self.param_count
    }

    fn sql(&self) -> &str {
        &self.sql
    }
}
