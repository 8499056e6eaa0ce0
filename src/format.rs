//! Typed values rendered as SQL literals for a given dialect.

use std::fmt::Write;

use crate::dialect::Dialect;
use crate::error::DbConnError;
use crate::printf::sprintf;
use crate::types::RowValues;

/// Default layout of timestamp literals.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `value` as a literal.
///
/// `null_if_empty` turns zero-length text and binary values into `null`. `fmt` is a
/// printf-style spec for text and numbers, or a strftime pattern for timestamps.
///
/// # Errors
/// Returns `DbConnError::ParameterError` for an invalid printf spec.
pub fn format_value(
    dialect: &dyn Dialect,
    value: &RowValues,
    null_if_empty: bool,
    fmt: Option<&str>,
) -> Result<String, DbConnError> {
    if value.is_null() || (null_if_empty && value.is_empty()) {
        return Ok("null".to_string());
    }

    let literal = match value {
        RowValues::Text(s) => {
            let text = match fmt {
                Some(fmt) => sprintf(fmt, value)?,
                None => s.clone(),
            };
            dialect.text_literal(&text)
        }
        RowValues::Int(i) => match fmt {
            Some(fmt) => sprintf(fmt, value)?,
            None => i.to_string(),
        },
        RowValues::Float(f) if !f.is_finite() => "null".to_string(),
        RowValues::Float(f) => match fmt {
            Some(fmt) => sprintf(fmt, value)?,
            None => f.to_string(),
        },
        RowValues::Bool(b) => dialect.quoted_str(if *b { "S" } else { "N" }),
        RowValues::Timestamp(ts) => {
            let pattern = fmt.unwrap_or(TIMESTAMP_FORMAT);
            let mut text = String::new();
            write!(text, "{}", ts.format(pattern)).map_err(|_| {
                DbConnError::ParameterError(format!("invalid timestamp format `{pattern}`"))
            })?;
            dialect.quoted_str(&dialect.escape_str(&text))
        }
        RowValues::JSON(json) => dialect.text_literal(&json.to_string()),
        RowValues::Blob(bytes) => dialect.binary_literal(bytes),
        RowValues::Null => "null".to_string(),
    };
    Ok(literal)
}

/// Literals for each value, comma separated.
///
/// # Errors
/// Propagates any error from [`format_value`].
pub fn format_all(dialect: &dyn Dialect, values: &[RowValues]) -> Result<String, DbConnError> {
    let parts = values
        .iter()
        .map(|v| format_value(dialect, v, false, None))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(","))
}

/// Right-hand side of a comparison, `" = 5"`, with NULL turned into `IS [NOT] NULL`.
///
/// # Errors
/// Propagates any error from [`format_value`].
pub fn format_cond(
    dialect: &dyn Dialect,
    value: &RowValues,
    op: &str,
    null_if_empty: bool,
    fmt: Option<&str>,
) -> Result<String, DbConnError> {
    if value.is_null() || (null_if_empty && value.is_empty()) {
        return Ok(if op.trim() == "=" {
            " IS NULL".to_string()
        } else {
            " IS NOT NULL".to_string()
        });
    }
    Ok(format!(
        " {op} {}",
        format_value(dialect, value, null_if_empty, fmt)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MssqlDialect, MysqlDialect};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn nulls_and_empties() {
        assert_eq!(format_value(&MysqlDialect::new(), &RowValues::Null, false, None).unwrap(), "null");
        let empty = RowValues::Text(String::new());
        assert_eq!(format_value(&MysqlDialect::new(), &empty, true, None).unwrap(), "null");
        assert_eq!(format_value(&MysqlDialect::new(), &empty, false, None).unwrap(), "''");
        // Zero is a value, not an empty string.
        assert_eq!(format_value(&MysqlDialect::new(), &RowValues::Int(0), true, None).unwrap(), "0");
        assert_eq!(
            format_value(&MssqlDialect, &RowValues::Blob(vec![]), true, None).unwrap(),
            "null"
        );
    }

    #[test]
    fn text_is_escaped_per_dialect() {
        let v = RowValues::from("O'Brien");
        assert_eq!(format_value(&MysqlDialect::new(), &v, false, None).unwrap(), r"'O\'Brien'");
        assert_eq!(format_value(&MssqlDialect, &v, false, None).unwrap(), "N'O''Brien'");
    }

    #[test]
    fn printf_specs_apply_before_escaping() {
        let v = RowValues::from("x'y");
        assert_eq!(
            format_value(&MssqlDialect, &v, false, Some("[%5s]")).unwrap(),
            "N'[  x''y]'"
        );
        assert_eq!(
            format_value(&MysqlDialect::new(), &RowValues::Int(42), false, Some("%05d")).unwrap(),
            "00042"
        );
        assert_eq!(
            format_value(&MysqlDialect::new(), &RowValues::Float(2.5), false, Some("%.2f")).unwrap(),
            "2.50"
        );
        assert!(format_value(&MysqlDialect::new(), &RowValues::Int(1), false, Some("%d%d")).is_err());
    }

    #[test]
    fn numbers_booleans_and_non_finite() {
        assert_eq!(format_value(&MysqlDialect::new(), &RowValues::Int(-7), false, None).unwrap(), "-7");
        assert_eq!(format_value(&MysqlDialect::new(), &RowValues::Float(1.25), false, None).unwrap(), "1.25");
        assert_eq!(
            format_value(&MysqlDialect::new(), &RowValues::Float(f64::NAN), false, None).unwrap(),
            "null"
        );
        assert_eq!(format_value(&MssqlDialect, &RowValues::Bool(true), false, None).unwrap(), "'S'");
        assert_eq!(format_value(&MssqlDialect, &RowValues::Bool(false), false, None).unwrap(), "'N'");
    }

    #[test]
    fn timestamps_json_and_blobs() {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        let v = RowValues::Timestamp(ts);
        assert_eq!(
            format_value(&MysqlDialect::new(), &v, false, None).unwrap(),
            "'2024-02-29 13:05:09'"
        );
        assert_eq!(
            format_value(&MssqlDialect, &v, false, Some("%d/%m/%Y")).unwrap(),
            "'29/02/2024'"
        );
        assert!(format_value(&MssqlDialect, &v, false, Some("%Q")).is_err());

        let doc = RowValues::JSON(json!({"name": "d'Arc"}));
        assert_eq!(
            format_value(&MssqlDialect, &doc, false, None).unwrap(),
            r#"N'{"name":"d''Arc"}'"#
        );
        assert_eq!(
            format_value(&MysqlDialect::new(), &RowValues::Blob(vec![1, 2]), false, None).unwrap(),
            "X'0102'"
        );
    }

    #[test]
    fn format_all_joins_with_commas() {
        let values = [RowValues::from(1), RowValues::from("a"), RowValues::Null];
        assert_eq!(format_all(&MssqlDialect, &values).unwrap(), "1,N'a',null");
        assert_eq!(format_all(&MssqlDialect, &[]).unwrap(), "");
    }

    #[test]
    fn conditions() {
        let d = &MysqlDialect::new();
        assert_eq!(format_cond(d, &RowValues::Null, "=", false, None).unwrap(), " IS NULL");
        assert_eq!(format_cond(d, &RowValues::Null, "<>", false, None).unwrap(), " IS NOT NULL");
        assert_eq!(format_cond(d, &RowValues::Int(5), "=", false, None).unwrap(), " = 5");
        assert_eq!(format_cond(d, &RowValues::from("a"), "<>", false, None).unwrap(), " <> 'a'");
        assert_eq!(
            format_cond(d, &RowValues::from(""), "=", true, None).unwrap(),
            " IS NULL"
        );
    }
}
