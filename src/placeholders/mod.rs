//! Positional `?` placeholders.
//!
//! Statements are written with `?` markers for both backends. MySQL takes them as-is; SQL
//! Server needs named `@P1, @P2, ...` parameters, so the text is rewritten before binding.
//! Markers inside string literals, quoted identifiers and comments are left alone.

use std::borrow::Cow;

mod scanner;

pub use scanner::Flavor;
pub(crate) use scanner::scan_code;

/// Number of `?` placeholders outside literals and comments.
#[must_use]
pub fn count_placeholders(sql: &str, flavor: Flavor) -> usize {
    let mut count = 0;
    scan_code(sql, flavor, |_, b| {
        if b == b'?' {
            count += 1;
        }
    });
    count
}

/// Rewrite `?` placeholders to SQL Server's `@P1, @P2, ...`.
///
/// Returns a borrowed `Cow` when the statement has no placeholders.
#[must_use]
pub fn to_mssql_params(sql: &str) -> Cow<'_, str> {
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut n = 0;

    scan_code(sql, Flavor::Tsql, |idx, b| {
        if b == b'?' {
            n += 1;
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
            buf.push_str(&sql[copied..idx]);
            buf.push_str("@P");
            buf.push_str(&n.to_string());
            copied = idx + 1;
        }
    });

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}
