//! Dialect-neutral names for SQL functions.
//!
//! Each backend renders the same logical operation with its own syntax, so callers can
//! compose SQL text without branching on the database type:
//! ```rust
//! use dbconn::functions::{DatePart, Functions, MssqlFunctions, MysqlFunctions};
//!
//! assert_eq!(MysqlFunctions.date_extract("created", DatePart::Year), "year( created )");
//! assert_eq!(MssqlFunctions.date_extract("created", DatePart::Year), "datepart( yyyy, created )");
//! ```

mod mssql;
mod mysql;

pub use mssql::MssqlFunctions;
pub use mysql::MysqlFunctions;

/// Target type of [`Functions::cast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    Binary,
    Char,
    Integer,
    Unsigned,
    Decimal,
    Datetime,
    Date,
    Time,
    Json,
}

/// Component of a date/time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Microsecond,
    DayOfWeek,
    DayOfYear,
    WeekOfYear,
}

/// Per-dialect SQL function syntax. Every method takes SQL fragments and returns a fragment.
pub trait Functions: Send + Sync {
    fn avg(&self, s: &str) -> String {
        format!("avg( {s} )")
    }

    fn count(&self, s: &str, distinct: bool) -> String {
        if distinct {
            format!("count( DISTINCT {s} )")
        } else {
            format!("count( {s} )")
        }
    }

    fn max(&self, s: &str) -> String {
        format!("max( {s} )")
    }

    fn min(&self, s: &str) -> String {
        format!("min( {s} )")
    }

    fn sum(&self, s: &str) -> String {
        format!("sum( {s} )")
    }

    fn lower(&self, s: &str) -> String {
        format!("lower( {s} )")
    }

    fn upper(&self, s: &str) -> String {
        format!("upper( {s} )")
    }

    fn ltrim(&self, s: &str) -> String {
        format!("ltrim( {s} )")
    }

    fn rtrim(&self, s: &str) -> String {
        format!("rtrim( {s} )")
    }

    fn trim(&self, s: &str) -> String;

    /// `start` is 1-based, as in SQL.
    fn substr(&self, s: &str, start: i64, len: i64) -> String;

    fn replace(&self, s: &str, from: &str, to: &str) -> String {
        format!("replace( {s}, {from}, {to} )")
    }

    fn concat(&self, args: &[&str]) -> String;

    fn ceil(&self, v: &str) -> String;

    fn floor(&self, v: &str) -> String {
        format!("floor( {v} )")
    }

    fn round(&self, v: &str, places: i32) -> String;

    fn trunc(&self, v: &str, places: i32) -> String;

    fn cast(&self, v: &str, to: CastType, size: Option<u32>, precision: Option<u32>) -> String {
        format!("cast( {v} AS {} )", self.cast_type(to, size, precision))
    }

    /// Type name used by [`Functions::cast`].
    fn cast_type(&self, to: CastType, size: Option<u32>, precision: Option<u32>) -> String;

    fn iif(&self, cond: &str, then: &str, otherwise: &str) -> String;

    fn ifnull(&self, x: &str, fallback: &str) -> String;

    /// Boolean expression, true when `x` is NULL.
    fn isnull(&self, x: &str) -> String;

    fn coalesce(&self, values: &[&str]) -> String {
        format!("coalesce( {} )", values.join(", "))
    }

    fn greatest(&self, values: &[&str]) -> String;

    fn least(&self, values: &[&str]) -> String;

    /// Equality that treats two NULLs as equal.
    fn null_safe_equal(&self, a: &str, b: &str) -> String;

    /// Current timestamp; `precision` is the number of fractional-second digits where the
    /// backend supports it.
    fn now(&self, precision: u8) -> String;

    /// Current date.
    fn date(&self) -> String;

    /// Current time of day.
    fn time(&self, precision: u8) -> String;

    /// Add `amount` (a number or SQL expression) units of `part` to `date`.
    fn date_add(&self, date: &str, part: DatePart, amount: &str) -> String;

    fn date_extract(&self, field: &str, part: DatePart) -> String;

    /// Reference to the incoming value of `column` inside an upsert's update clause.
    fn value(&self, column: &str) -> String;
}

/// Expand a variadic greatest/least into nested `iif` comparisons.
///
/// For `[a, b, c]` and `" > "` this yields
/// `iif(a > b, iif(a > c, a, c), iif(b > c, b, c))`: each level compares the current
/// candidate against the next value and recurses on whichever side won.
pub(crate) fn iif_nest(values: &[&str], oper: &str) -> String {
    match values {
        [] => "null".to_string(),
        [single] => (*single).to_string(),
        _ => nest(values, oper, 0, 1),
    }
}

fn nest(values: &[&str], oper: &str, start: usize, end: usize) -> String {
    let last = values.len() - 1;
    let mut r = format!("iif({}{oper}{}, ", values[start], values[end]);

    if end == last {
        r.push_str(values[start]);
        r.push_str(", ");
        r.push_str(values[end]);
    } else {
        r.push_str(&nest(values, oper, start, end + 1));
        r.push_str(", ");
        r.push_str(&nest(values, oper, end, end + 1));
    }

    r.push(')');
    r
}

/// Split a signed literal amount into sign and magnitude; `None` for expressions.
pub(crate) fn negative_literal(amount: &str) -> Option<&str> {
    let trimmed = amount.trim();
    let magnitude = trimmed.strip_prefix('-')?.trim_start();
    if !magnitude.is_empty() && magnitude.parse::<f64>().is_ok() {
        Some(magnitude)
    } else {
        None
    }
}
