use std::sync::Arc;

use mysql_async::prelude::Queryable;
use mysql_async::{Column, Conn, QueryResult, Row, TextProtocol};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::value::{field_info, row_values};
use crate::connection::ConnectionState;
use crate::cursor::{Columns, Cursor, RowBuffer};
use crate::error::DbConnError;
use crate::results::{DataRow, FieldInfo};
use crate::types::FetchShape;

enum Source<'a> {
    Buffered(RowBuffer),
    Streaming {
        result: Option<QueryResult<'a, 'static, TextProtocol>>,
        columns: Columns,
        fetched: u64,
        shape: FetchShape,
    },
}

/// Rows of a MySQL query. Streaming cursors hold the connection until closed or dropped.
pub struct MysqlCursor<'a> {
    runtime: &'a Runtime,
    state: &'a mut ConnectionState,
    fields: Arc<[Column]>,
    source: Source<'a>,
    closed: bool,
}

impl<'a> MysqlCursor<'a> {
    pub(crate) fn open(
        runtime: &'a Runtime,
        conn: &'a mut Conn,
        state: &'a mut ConnectionState,
        sql: &str,
        shape: FetchShape,
        fetch_all: bool,
    ) -> Result<Self, DbConnError> {
        debug!(sql, fetch_all, "mysql query");
        let opened = runtime.block_on(async move {
            let mut result = conn.query_iter(sql.to_owned()).await?;
            let fields = result.columns().unwrap_or_else(|| Arc::from(Vec::new()));
            let columns = Columns::new(fields.iter().map(|c| c.name_str().into_owned()).collect());
            let source = if fetch_all {
                let rows = result.collect::<Row>().await?;
                result.drop_result().await?;
                Source::Buffered(RowBuffer::new(
                    columns,
                    rows.into_iter().map(row_values).collect(),
                    shape,
                ))
            } else {
                Source::Streaming {
                    result: Some(result),
                    columns,
                    fetched: 0,
                    shape,
                }
            };
            Ok::<_, mysql_async::Error>((fields, source))
        });
        let (fields, source) = state.track(opened.map_err(DbConnError::from))?;
        Ok(Self {
            runtime,
            state,
            fields,
            source,
            closed: false,
        })
    }

    fn columns(&self) -> &Columns {
        match &self.source {
            Source::Buffered(buffer) => &buffer.columns,
            Source::Streaming { columns, .. } => columns,
        }
    }

    fn release(&mut self) -> Result<(), DbConnError> {
        self.closed = true;
        match &mut self.source {
            Source::Buffered(buffer) => {
                buffer.close();
                Ok(())
            }
            Source::Streaming { result, .. } => match result.take() {
                Some(result) => Ok(self.runtime.block_on(result.drop_result())?),
                None => Ok(()),
            },
        }
    }
}

impl Cursor for MysqlCursor<'_> {
    fn next(&mut self, shape: Option<FetchShape>) -> Result<Option<DataRow>, DbConnError> {
        if self.closed {
            return Ok(None);
        }
        match &mut self.source {
            Source::Buffered(buffer) => Ok(buffer.next(shape)),
            Source::Streaming {
                result,
                columns,
                fetched,
                shape: default_shape,
            } => {
                let Some(open) = result.as_mut() else {
                    return Ok(None);
                };
                let fetched_row = self.runtime.block_on(open.next()).map_err(DbConnError::from);
                if let Some(row) = self.state.track(fetched_row)? {
                    *fetched += 1;
                    return Ok(Some(columns.row(row_values(row), shape.unwrap_or(*default_shape))));
                }
                // Exhausted: hand the connection back.
                if let Some(done) = result.take() {
                    let drained = self.runtime.block_on(done.drop_result()).map_err(DbConnError::from);
                    self.state.track(drained)?;
                }
                Ok(None)
            }
        }
    }

    fn num_rows(&self) -> u64 {
        match &self.source {
            Source::Buffered(buffer) => buffer.num_rows(),
            Source::Streaming { fetched, .. } => *fetched,
        }
    }

    fn num_fields(&self) -> usize {
        self.columns().len()
    }

    fn column_names(&self) -> &[String] {
        self.columns().names()
    }

    fn fields_info(&mut self) -> Result<Vec<FieldInfo>, DbConnError> {
        Ok(self.fields.iter().map(field_info).collect())
    }

    fn close(&mut self) -> Result<(), DbConnError> {
        let released = self.release();
        self.state.track(released)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn default_shape(&self) -> FetchShape {
        match &self.source {
            Source::Buffered(buffer) => buffer.shape(),
            Source::Streaming { shape, .. } => *shape,
        }
    }
}

impl Drop for MysqlCursor<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "discarding unread mysql rows failed");
        }
    }
}
