use indexmap::IndexMap;

use super::row::CustomDbRow;
use crate::types::{FetchShape, RowValues};

/// A fetched row in the shape the caller asked for.
#[derive(Debug, Clone)]
pub enum DataRow {
    /// Values by position.
    Numeric(Vec<RowValues>),
    /// Values by column name, in select-list order. A repeated column name keeps the last value.
    Named(IndexMap<String, RowValues>),
    /// Values reachable both ways.
    Both(CustomDbRow),
}

impl DataRow {
    /// Shape a row of raw values.
    #[must_use]
    pub fn shaped(row: CustomDbRow, shape: FetchShape) -> Self {
        match shape {
            FetchShape::Numeric => DataRow::Numeric(row.rows),
            FetchShape::Named => {
                let mut named = IndexMap::with_capacity(row.rows.len());
                for (name, value) in row.column_names.iter().zip(row.rows) {
                    named.insert(name.clone(), value);
                }
                DataRow::Named(named)
            }
            FetchShape::Both => DataRow::Both(row),
        }
    }

    #[must_use]
    pub fn shape(&self) -> FetchShape {
        match self {
            DataRow::Numeric(_) => FetchShape::Numeric,
            DataRow::Named(_) => FetchShape::Named,
            DataRow::Both(_) => FetchShape::Both,
        }
    }

    /// Value by column name. Always `None` for numeric rows.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        match self {
            DataRow::Numeric(_) => None,
            DataRow::Named(map) => map.get(column_name),
            DataRow::Both(row) => row.get(column_name),
        }
    }

    /// Value by position. Named rows count positions over their distinct names.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        match self {
            DataRow::Numeric(values) => values.get(index),
            DataRow::Named(map) => map.get_index(index).map(|(_, v)| v),
            DataRow::Both(row) => row.get_by_index(index),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            DataRow::Numeric(values) => values.len(),
            DataRow::Named(map) => map.len(),
            DataRow::Both(row) => row.rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the keys and keep the values.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        match self {
            DataRow::Numeric(values) => values,
            DataRow::Named(map) => map.into_values().collect(),
            DataRow::Both(row) => row.rows,
        }
    }
}
