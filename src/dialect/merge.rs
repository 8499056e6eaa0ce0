//! Upsert ("merge") synthesis shared by both dialects.
//!
//! A merge names a target table, the key columns that identify a row and the full list of
//! fields supplied by the source. The source is either a query or one or more literal
//! tuples. Non-key fields are updated on a match (unless the caller supplies its own update
//! list); all fields are inserted otherwise.

use crate::error::DbConnError;
use crate::functions::Functions;
use crate::placeholders::{Flavor, scan_code};

/// Rows to merge into the target table.
#[derive(Debug, Clone, Copy)]
pub enum MergeSource<'a> {
    /// A query whose columns line up with the field list.
    Select(&'a str),
    /// Literal tuples such as `"1,'a'"` or `"(1,'a'),(2,'b')"`.
    Values(&'a [&'a str]),
}

/// Parameters of an upsert.
///
/// ```rust
/// use dbconn::dialect::{Dialect, MergeRequest, MysqlDialect};
///
/// let values = ["1,'alice'"];
/// let sql = MysqlDialect::new()
///     .merge(&MergeRequest::values("users", "id", "id,name", &values))
///     .unwrap();
/// assert_eq!(
///     sql,
///     "INSERT INTO users( id,name ) VALUES (1,'alice') ON DUPLICATE KEY UPDATE name = Values( name );"
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MergeRequest<'a> {
    pub table: &'a str,
    /// Comma separated key columns.
    pub keys: &'a str,
    /// Comma separated fields provided by the source, keys included.
    pub fields: &'a str,
    pub source: MergeSource<'a>,
    /// Only update rows that already exist.
    pub ignore_insert: bool,
    /// Replacement for the generated update list, used verbatim.
    pub on_update: Option<&'a str>,
}

impl<'a> MergeRequest<'a> {
    #[must_use]
    pub fn select(table: &'a str, keys: &'a str, fields: &'a str, select: &'a str) -> Self {
        Self {
            table,
            keys,
            fields,
            source: MergeSource::Select(select),
            ignore_insert: false,
            on_update: None,
        }
    }

    #[must_use]
    pub fn values(table: &'a str, keys: &'a str, fields: &'a str, values: &'a [&'a str]) -> Self {
        Self {
            table,
            keys,
            fields,
            source: MergeSource::Values(values),
            ignore_insert: false,
            on_update: None,
        }
    }

    #[must_use]
    pub fn ignore_insert(mut self, ignore_insert: bool) -> Self {
        self.ignore_insert = ignore_insert;
        self
    }

    #[must_use]
    pub fn on_update(mut self, on_update: &'a str) -> Self {
        self.on_update = Some(on_update);
        self
    }
}

/// Column lists derived from a [`MergeRequest`].
#[derive(Debug)]
pub(crate) struct MergePlan {
    pub keys: Vec<String>,
    pub fields: Vec<String>,
    /// Non-key fields, in field order.
    pub update_fields: Vec<String>,
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl MergePlan {
    pub(crate) fn new(request: &MergeRequest<'_>) -> Result<Self, DbConnError> {
        let keys = split_list(request.keys);
        let fields = split_list(request.fields);

        if keys.is_empty() {
            return Err(DbConnError::ParameterError(format!(
                "merge into {} needs at least one key column",
                request.table
            )));
        }
        if fields.is_empty() {
            return Err(DbConnError::ParameterError(format!(
                "merge into {} needs at least one field",
                request.table
            )));
        }
        if let Some(missing) = keys.iter().find(|k| !fields.contains(k)) {
            return Err(DbConnError::ParameterError(format!(
                "merge key {missing} is not one of the fields"
            )));
        }

        let update_fields = fields
            .iter()
            .filter(|f| !keys.contains(f))
            .cloned()
            .collect();

        Ok(Self {
            keys,
            fields,
            update_fields,
        })
    }

    /// `t.k1 = s.k1 AND t.k2 = s.k2`
    pub(crate) fn condition(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("t.{k} = s.{k}"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// `f = <source value of f>` for each non-key field, or the caller's override.
    pub(crate) fn update_list(&self, request: &MergeRequest<'_>, funcs: &dyn Functions) -> String {
        match request.on_update {
            Some(custom) => custom.trim().to_string(),
            None => self
                .update_fields
                .iter()
                .map(|f| format!("{f} = {}", funcs.value(f)))
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    pub(crate) fn field_list(&self) -> String {
        self.fields.join(",")
    }

    pub(crate) fn nothing_to_update(table: &str) -> DbConnError {
        DbConnError::ParameterError(format!(
            "update-only merge into {table} has no non-key fields to update"
        ))
    }
}

/// `VALUES (..),(..)` from literal tuples; bare tuples get their parentheses added.
pub(crate) fn values_clause(values: &[&str]) -> Result<String, DbConnError> {
    let tuples: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| {
            if v.starts_with('(') {
                v.to_string()
            } else {
                format!("({v})")
            }
        })
        .collect();

    if tuples.is_empty() {
        return Err(DbConnError::ParameterError(
            "merge needs at least one value tuple".to_string(),
        ));
    }
    Ok(format!("VALUES {}", tuples.join(",")))
}

/// Split literal tuples into their items, ignoring commas and parentheses inside string
/// literals or nested expressions.
///
/// `"(1,'a,b'),(2,concat('x','y'))"` yields `[["1", "'a,b'"], ["2", "concat('x','y')"]]`.
pub(crate) fn split_tuples(values: &[&str], flavor: Flavor) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if value.starts_with('(') {
            for inner in top_level_groups(value, flavor) {
                rows.push(split_items(inner, flavor));
            }
        } else {
            rows.push(split_items(value, flavor));
        }
    }
    rows
}

fn top_level_groups(s: &str, flavor: Flavor) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    scan_code(s, flavor, |idx, b| match b {
        b'(' => {
            if depth == 0 {
                start = idx + 1;
            }
            depth += 1;
        }
        b')' if depth > 0 => {
            depth -= 1;
            if depth == 0 {
                groups.push(&s[start..idx]);
            }
        }
        _ => {}
    });
    groups
}

fn split_items(s: &str, flavor: Flavor) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    scan_code(s, flavor, |idx, b| match b {
        b'(' => depth += 1,
        b')' => depth = depth.saturating_sub(1),
        b',' if depth == 0 => {
            items.push(s[start..idx].trim().to_string());
            start = idx + 1;
        }
        _ => {}
    });
    items.push(s[start..].trim().to_string());
    items
}
