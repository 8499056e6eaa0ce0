//! Row iteration over a query result.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::error::DbConnError;
use crate::results::row::build_column_index;
use crate::results::{CustomDbRow, DataRow, FieldInfo};
use crate::types::{FetchShape, RowValues};

/// An open query result. Cursors borrow their connection, so a connection runs one
/// cursor or statement at a time.
///
/// ```rust,no_run
/// use dbconn::prelude::*;
///
/// # fn demo(conn: &mut dyn Connection) -> Result<(), DbConnError> {
/// let mut cursor = conn.get_cursor("SELECT id, name FROM users", None, false)?;
/// while let Some(row) = cursor.next(None)? {
///     println!("{:?} {:?}", row.get("id"), row.get("name"));
/// }
/// cursor.close()?;
/// # Ok(())
/// # }
/// ```
pub trait Cursor {
    /// Next row in `shape`, or the cursor's default shape. `None` at the end of the result
    /// and after [`Cursor::close`].
    ///
    /// # Errors
    /// Returns the driver error if fetching the row fails.
    fn next(&mut self, shape: Option<FetchShape>) -> Result<Option<DataRow>, DbConnError>;

    /// Rows in the result if it is buffered, otherwise rows fetched so far.
    fn num_rows(&self) -> u64;

    fn num_fields(&self) -> usize;

    fn column_names(&self) -> &[String];

    /// Metadata for every column of the result.
    ///
    /// # Errors
    /// Returns the driver error if the metadata lookup fails.
    fn fields_info(&mut self) -> Result<Vec<FieldInfo>, DbConnError>;

    /// Release the result. Calling it again does nothing.
    ///
    /// # Errors
    /// Returns the driver error if discarding unread rows fails.
    fn close(&mut self) -> Result<(), DbConnError>;

    fn is_closed(&self) -> bool;

    fn default_shape(&self) -> FetchShape;
}

/// Column names of a result plus their name lookup, shared by every row.
#[derive(Debug, Clone, Default)]
pub(crate) struct Columns {
    names: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

impl Columns {
    pub(crate) fn new(names: Vec<String>) -> Self {
        let index = Arc::new(build_column_index(&names));
        Self {
            names: Arc::new(names),
            index,
        }
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    pub(crate) fn row(&self, values: Vec<RowValues>, shape: FetchShape) -> DataRow {
        let row = CustomDbRow::with_cache(Arc::clone(&self.names), Arc::clone(&self.index), values);
        DataRow::shaped(row, shape)
    }
}

/// A fully fetched result, read front to back.
#[derive(Debug, Default)]
pub(crate) struct RowBuffer {
    pub(crate) columns: Columns,
    rows: VecDeque<Vec<RowValues>>,
    total: u64,
    shape: FetchShape,
    closed: bool,
}

impl RowBuffer {
    pub(crate) fn new(columns: Columns, rows: Vec<Vec<RowValues>>, shape: FetchShape) -> Self {
        Self {
            columns,
            total: rows.len() as u64,
            rows: rows.into(),
            shape,
            closed: false,
        }
    }

    pub(crate) fn next(&mut self, shape: Option<FetchShape>) -> Option<DataRow> {
        if self.closed {
            return None;
        }
        let values = self.rows.pop_front()?;
        Some(self.columns.row(values, shape.unwrap_or(self.shape)))
    }

    pub(crate) fn num_rows(&self) -> u64 {
        self.total
    }

    pub(crate) fn close(&mut self) {
        self.rows.clear();
        self.closed = true;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn shape(&self) -> FetchShape {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(shape: FetchShape) -> RowBuffer {
        let columns = Columns::new(vec!["id".into(), "name".into()]);
        let rows = vec![
            vec![RowValues::Int(1), RowValues::from("a")],
            vec![RowValues::Int(2), RowValues::from("b")],
        ];
        RowBuffer::new(columns, rows, shape)
    }

    #[test]
    fn yields_rows_in_default_shape() {
        let mut buf = buffer(FetchShape::Named);
        assert_eq!(buf.num_rows(), 2);
        assert_eq!(buf.columns.len(), 2);

        let first = buf.next(None).unwrap();
        assert_eq!(first.shape(), FetchShape::Named);
        assert_eq!(first.get("name"), Some(&RowValues::from("a")));

        let second = buf.next(Some(FetchShape::Numeric)).unwrap();
        assert_eq!(second.get_by_index(0), Some(&RowValues::Int(2)));
        assert!(second.get("id").is_none());

        assert!(buf.next(None).is_none());
        // Still the size of the result, not what is left of it.
        assert_eq!(buf.num_rows(), 2);
    }

    #[test]
    fn closed_buffer_yields_nothing() {
        let mut buf = buffer(FetchShape::Both);
        buf.close();
        buf.close();
        assert!(buf.is_closed());
        assert!(buf.next(None).is_none());
    }

    #[test]
    fn both_shape_reads_by_name_and_position() {
        let mut buf = buffer(FetchShape::Both);
        let row = buf.next(None).unwrap();
        assert_eq!(row.get("id"), row.get_by_index(0));
        assert_eq!(buf.shape(), FetchShape::Both);
    }
}
