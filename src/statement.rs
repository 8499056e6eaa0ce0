//! Prepared statements with positional `?` parameters.

use crate::error::DbConnError;
use crate::format::TIMESTAMP_FORMAT;
use crate::types::RowValues;

/// A statement prepared once and executed with different parameters.
pub trait Statement {
    /// Bind `params` in order and run the statement, returning the rows affected.
    ///
    /// # Errors
    /// Returns `DbConnError::ParameterError` when `params.len()` differs from
    /// [`Statement::param_count`], or the driver error if execution fails.
    fn execute(&mut self, params: &[RowValues]) -> Result<u64, DbConnError>;

    /// Number of `?` placeholders.
    fn param_count(&self) -> usize;

    fn sql(&self) -> &str;
}

/// Parameter value as sent to the server.
///
/// Values are narrowed to the types both backends bind natively; booleans, timestamps and
/// JSON travel as text in the same form [`crate::format::format_value`] would render them.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Null,
}

impl From<&RowValues> for BindValue {
    fn from(value: &RowValues) -> Self {
        match value {
            RowValues::Int(i) => BindValue::Int(*i),
            RowValues::Float(f) => BindValue::Float(*f),
            RowValues::Text(s) => BindValue::Text(s.clone()),
            RowValues::Bool(b) => BindValue::Text(if *b { "S" } else { "N" }.to_string()),
            RowValues::Timestamp(ts) => BindValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
            RowValues::JSON(json) => BindValue::Text(json.to_string()),
            RowValues::Blob(bytes) => BindValue::Bytes(bytes.clone()),
            RowValues::Null => BindValue::Null,
        }
    }
}

/// Convert `params`, checking there is exactly one per placeholder.
///
/// # Errors
/// Returns `DbConnError::ParameterError` on a count mismatch.
pub(crate) fn bind_values(
    params: &[RowValues],
    expected: usize,
) -> Result<Vec<BindValue>, DbConnError> {
    if params.len() != expected {
        return Err(DbConnError::ParameterError(format!(
            "statement expects {expected} parameters, got {}",
            params.len()
        )));
    }
    Ok(params.iter().map(BindValue::from).collect())
}
