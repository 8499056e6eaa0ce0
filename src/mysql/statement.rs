use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Params, Statement as ServerStatement};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::value::to_mysql_value;
use crate::connection::ConnectionState;
use crate::error::DbConnError;
use crate::statement::{Statement, bind_values};
use crate::types::RowValues;

/// A server-side prepared statement, closed when dropped.
pub struct MysqlStatement<'a> {
    runtime: &'a Runtime,
    conn: &'a mut Conn,
    state: &'a mut ConnectionState,
    statement: Option<ServerStatement>,
    sql: String,
}

impl<'a> MysqlStatement<'a> {
    pub(crate) fn prepare(
        runtime: &'a Runtime,
        conn: &'a mut Conn,
        state: &'a mut ConnectionState,
        sql: &str,
    ) -> Result<Self, DbConnError> {
        debug!(sql, "mysql prepare");
        let prepared = runtime.block_on(conn.prep(sql)).map_err(DbConnError::from);
        let statement = state.track(prepared)?;
        Ok(Self {
            runtime,
            conn,
            state,
            statement: Some(statement),
            sql: sql.to_string(),
        })
    }

    fn run(&mut self, params: &[RowValues]) -> Result<u64, DbConnError> {
        let statement = self
            .statement
            .as_ref()
            .ok_or_else(|| DbConnError::ExecutionError("statement is closed".to_string()))?;
        let values = bind_values(params, usize::from(statement.num_params()))?;
        let params = if values.is_empty() {
            Params::Empty
        } else {
            Params::Positional(values.into_iter().map(to_mysql_value).collect())
        };
        self.runtime.block_on(self.conn.exec_drop(statement, params))?;
        Ok(self.conn.affected_rows())
    }
}

impl Statement for MysqlStatement<'_> {
    fn execute(&mut self, params: &[RowValues]) -> Result<u64, DbConnError> {
        let result = self.run(params);
        self.state.track(result)
    }

    fn param_count(&self) -> usize {
        self.statement
            .as_ref()
            .map_or(0, |s| usize::from(s.num_params()))
    }

    fn sql(&self) -> &str {
        &self.sql
    }
}

impl Drop for MysqlStatement<'_> {
    fn drop(&mut self) {
        if let Some(statement) = self.statement.take() {
            if let Err(e) = self.runtime.block_on(self.conn.close(statement)) {
                warn!(error = %e, sql = %self.sql, "closing mysql statement failed");
            }
        }
    }
}
