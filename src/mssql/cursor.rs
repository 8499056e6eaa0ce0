use futures_util::TryStreamExt;
use tiberius::{Column, Row};
use tokio::runtime::Runtime;
use tracing::debug;

use super::client::MssqlClient;
use super::query::{DESCRIBE_SQL, described_field_info, row_values, stream_field_info};
use crate::connection::ConnectionState;
use crate::cursor::{Columns, Cursor, RowBuffer};
use crate::error::DbConnError;
use crate::results::{DataRow, FieldInfo};
use crate::types::FetchShape;

/// Rows of a SQL Server query, read in full when the cursor opens.
pub struct MssqlCursor<'a> {
    runtime: &'a Runtime,
    client: &'a mut MssqlClient,
    sql: String,
    metadata: Vec<Column>,
    buffer: RowBuffer,
    fields: Option<Vec<FieldInfo>>,
}

impl<'a> MssqlCursor<'a> {
    pub(crate) fn open(
        runtime: &'a Runtime,
        client: &'a mut MssqlClient,
        state: &mut ConnectionState,
        sql: &str,
        shape: FetchShape,
    ) -> Result<Self, DbConnError> {
        debug!(sql, "mssql query");
        let fetched = runtime.block_on(async {
            let mut stream = client.simple_query(sql).await?;
            let metadata = stream.columns().await?.map(<[Column]>::to_vec).unwrap_or_default();
            let rows = stream.into_first_result().await?;
            Ok::<_, tiberius::error::Error>((metadata, rows))
        });
        let (metadata, rows) = state.track(fetched.map_err(DbConnError::from))?;

        let columns = Columns::new(metadata.iter().map(|c| c.name().to_string()).collect());
        let buffer = RowBuffer::new(columns, rows.into_iter().map(row_values).collect(), shape);
        Ok(Self {
            runtime,
            client,
            sql: sql.to_string(),
            metadata,
            buffer,
            fields: None,
        })
    }
}

async fn describe(client: &mut MssqlClient, sql: &str) -> tiberius::Result<Vec<FieldInfo>> {
    let rows: Vec<Row> = client
        .query(DESCRIBE_SQL, &[&sql])
        .await?
        .into_row_stream()
        .try_collect()
        .await?;
    rows.iter().map(described_field_info).collect()
}

impl Cursor for MssqlCursor<'_> {
    fn next(&mut self, shape: Option<FetchShape>) -> Result<Option<DataRow>, DbConnError> {
        Ok(self.buffer.next(shape))
    }

    fn num_rows(&self) -> u64 {
        self.buffer.num_rows()
    }

    fn num_fields(&self) -> usize {
        self.buffer.columns.len()
    }

    fn column_names(&self) -> &[String] {
        self.buffer.columns.names()
    }

    fn fields_info(&mut self) -> Result<Vec<FieldInfo>, DbConnError> {
        if let Some(fields) = &self.fields {
            return Ok(fields.clone());
        }
        let fields = match self.runtime.block_on(describe(self.client, &self.sql)) {
            Ok(described) if described.len() == self.metadata.len() => described,
            Ok(_) => self.metadata.iter().map(stream_field_info).collect(),
            Err(e) => {
                debug!(error = %e, "describing the result set failed, using stream metadata");
                self.metadata.iter().map(stream_field_info).collect()
            }
        };
        self.fields = Some(fields.clone());
        Ok(fields)
    }

    fn close(&mut self) -> Result<(), DbConnError> {
        self.buffer.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.buffer.is_closed()
    }

    fn default_shape(&self) -> FetchShape {
        self.buffer.shape()
    }
}
