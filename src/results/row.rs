use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// A row that can be read both by position and by column name.
///
/// Column names are shared by every row a cursor produces.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows of a cursor)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl CustomDbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `rows` - The values for this row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let cache = Arc::new(build_column_index(&column_names));
        Self {
            column_names,
            rows,
            column_index_cache: cache,
        }
    }

    /// Build a row reusing an index cache computed once per cursor.
    pub(crate) fn with_cache(
        column_names: Arc<Vec<String>>,
        column_index_cache: Arc<HashMap<String, usize>>,
        rows: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            rows,
            column_index_cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }
}

/// Map column names to positions. A repeated name resolves to its last occurrence.
pub(crate) fn build_column_index(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_position() {
        let names = Arc::new(vec!["id".to_string(), "name".to_string()]);
        let row = CustomDbRow::new(names, vec![RowValues::Int(7), RowValues::Text("x".into())]);

        assert_eq!(row.get("name"), Some(&RowValues::Text("x".into())));
        assert_eq!(row.get_by_index(0), Some(&RowValues::Int(7)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_by_index(5), None);
    }

    #[test]
    fn repeated_column_name_resolves_to_last() {
        let names = Arc::new(vec!["v".to_string(), "v".to_string()]);
        let row = CustomDbRow::new(names, vec![RowValues::Int(1), RowValues::Int(2)]);
        assert_eq!(row.get("v"), Some(&RowValues::Int(2)));
    }
}
