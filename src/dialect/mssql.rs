use super::merge::{MergePlan, MergeRequest, MergeSource, values_clause};
use super::{Dialect, hex, no_isolation_keyword};
use crate::error::DbConnError;
use crate::functions::{Functions, MssqlFunctions};
use crate::placeholders::{Flavor, scan_code};
use crate::types::{DatabaseType, IsolationLevel, RowValues};

static FUNCTIONS: MssqlFunctions = MssqlFunctions;

/// SQL Server syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDialect;

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'@' || b == b'#' || b == b'$'
}

/// Byte range of the first `keyword` in `sql` that is a whole word outside literals and
/// comments, matched case-insensitively.
fn find_keyword(sql: &str, keyword: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let kw = keyword.as_bytes();
    let mut found = None;
    scan_code(sql, Flavor::Tsql, |idx, _| {
        if found.is_some() {
            return;
        }
        let end = idx + kw.len();
        let matches = bytes.get(idx..end).is_some_and(|w| w.eq_ignore_ascii_case(kw))
            && (idx == 0 || !is_ident_byte(bytes[idx - 1]))
            && bytes.get(end).is_none_or(|b| !is_ident_byte(*b));
        if matches {
            found = Some(idx);
        }
    });
    found
}

/// Position right after `SELECT` and an optional `DISTINCT`/`ALL`, where `TOP n` belongs.
fn top_insert_point(sql: &str) -> Option<usize> {
    let after_select = find_keyword(sql, "select")? + "select".len();
    let rest = &sql[after_select..];
    let trimmed = rest.trim_start();
    let skipped = rest.len() - trimmed.len();
    for quantifier in ["distinct", "all"] {
        if find_keyword(trimmed, quantifier) == Some(0) {
            return Some(after_select + skipped + quantifier.len());
        }
    }
    Some(after_select)
}

impl Dialect for MssqlDialect {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    fn flavor(&self) -> Flavor {
        Flavor::Tsql
    }

    fn escape_str(&self, s: &str) -> String {
        s.replace('\'', "''")
    }

    /// `N'...'` keeps characters outside the database collation's code page.
    fn text_literal(&self, s: &str) -> String {
        format!("N{}", self.quoted_str(&self.escape_str(s)))
    }

    fn binary_literal(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex(bytes))
    }

    /// `OFFSET ... FETCH` requires the statement to carry an `ORDER BY`.
    fn limit(&self, sql: &str, limit: u64, offset: Option<u64>) -> String {
        if let Some(offset) = offset.filter(|o| *o > 0) {
            return format!("{sql} OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY");
        }
        match top_insert_point(sql) {
            Some(at) => format!("{} TOP {limit}{}", &sql[..at], &sql[at..]),
            None => sql.to_string(),
        }
    }

    fn merge(&self, request: &MergeRequest<'_>) -> Result<String, DbConnError> {
        let plan = MergePlan::new(request)?;
        let source = match request.source {
            MergeSource::Select(select) => select.trim().to_string(),
            MergeSource::Values(values) => values_clause(values)?,
        };
        let fields = plan.field_list();
        let updates = plan.update_list(request, &FUNCTIONS);
        if request.ignore_insert && updates.is_empty() {
            return Err(MergePlan::nothing_to_update(request.table));
        }

        let mut sql = format!(
            "MERGE INTO {} t USING( {source} ) AS s( {fields} ) ON( {} )",
            request.table,
            plan.condition()
        );
        if !updates.is_empty() {
            sql.push_str(" WHEN MATCHED THEN UPDATE SET ");
            sql.push_str(&updates);
        }
        if !request.ignore_insert {
            let inserted = plan
                .fields
                .iter()
                .map(|f| format!("s.{f}"))
                .collect::<Vec<_>>()
                .join(",");
            sql.push_str(&format!(
                " WHEN NOT MATCHED THEN INSERT( {fields} ) VALUES( {inserted} )"
            ));
        }
        sql.push(';');
        Ok(sql)
    }

    fn begin_sql(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    fn commit_sql(&self) -> &'static str {
        "COMMIT TRANSACTION"
    }

    fn rollback_sql(&self) -> &'static str {
        "ROLLBACK TRANSACTION"
    }

    fn isolation_sql(&self, level: IsolationLevel) -> Result<String, DbConnError> {
        let keyword = level.keyword().ok_or_else(no_isolation_keyword)?;
        Ok(format!("SET TRANSACTION ISOLATION LEVEL {keyword}"))
    }

    fn read_isolation_sql(&self) -> &'static str {
        "SELECT transaction_isolation_level FROM sys.dm_exec_sessions WHERE session_id = @@SPID"
    }

    fn parse_isolation(&self, value: &RowValues) -> IsolationLevel {
        match value.to_i64() {
            Some(1) => IsolationLevel::ReadUncommitted,
            Some(3) => IsolationLevel::RepeatableRead,
            Some(4) => IsolationLevel::Serializable,
            _ => IsolationLevel::ReadCommitted,
        }
    }

    fn next_key_sql(&self, source: &str, increment: i64, field: &str) -> String {
        format!("SELECT isnull( max( {field} ), 0 ) + {increment} AS next_key FROM {source}")
    }

    fn functions(&self) -> &'static dyn Functions {
        &FUNCTIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: MssqlDialect = MssqlDialect;

    #[test]
    fn escapes_by_doubling_quotes() {
        assert_eq!(D.escape_str("O'Brien"), "O''Brien");
        assert_eq!(D.escape_str(r"back\slash"), r"back\slash");
        assert_eq!(D.quoted_str(&D.escape_str("'")), "''''");
    }

    #[test]
    fn text_literals_are_national() {
        assert_eq!(D.text_literal("日本"), "N'日本'");
        assert_eq!(D.text_literal("it's"), "N'it''s'");
    }

    #[test]
    fn binary_literal_is_hex() {
        assert_eq!(D.binary_literal(&[0x00, 0xff]), "0x00FF");
    }

    #[test]
    fn limit_inserts_top_after_select() {
        assert_eq!(D.limit("SELECT * FROM t", 5, None), "SELECT TOP 5 * FROM t");
        assert_eq!(D.limit("select a from t", 5, Some(0)), "select TOP 5 a from t");
        assert_eq!(
            D.limit("SELECT DISTINCT a FROM t", 3, None),
            "SELECT DISTINCT TOP 3 a FROM t"
        );
    }

    #[test]
    fn limit_skips_lookalikes() {
        assert_eq!(
            D.limit("/* select */ SELECT selected FROM t", 2, None),
            "/* select */ SELECT TOP 2 selected FROM t"
        );
        assert_eq!(D.limit("EXEC proc", 2, None), "EXEC proc");
    }

    #[test]
    fn limit_with_offset_uses_fetch() {
        assert_eq!(
            D.limit("SELECT a FROM t ORDER BY a", 10, Some(30)),
            "SELECT a FROM t ORDER BY a OFFSET 30 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn merge_values() {
        let values = ["1,'a'"];
        let sql = D
            .merge(&MergeRequest::values("t", "id", "id,name", &values))
            .unwrap();
        assert_eq!(
            sql,
            "MERGE INTO t t USING( VALUES (1,'a') ) AS s( id,name ) ON( t.id = s.id ) \
             WHEN MATCHED THEN UPDATE SET name = s.name \
             WHEN NOT MATCHED THEN INSERT( id,name ) VALUES( s.id,s.name );"
        );
    }

    #[test]
    fn merge_select_update_only() {
        let req = MergeRequest::select("t", "a, b", "a,b,c", "SELECT a, b, c FROM x")
            .ignore_insert(true);
        assert_eq!(
            D.merge(&req).unwrap(),
            "MERGE INTO t t USING( SELECT a, b, c FROM x ) AS s( a,b,c ) \
             ON( t.a = s.a AND t.b = s.b ) WHEN MATCHED THEN UPDATE SET c = s.c;"
        );
    }

    #[test]
    fn merge_without_updates_only_inserts() {
        let values = ["(1),(2)"];
        let sql = D
            .merge(&MergeRequest::values("ids", "id", "id", &values))
            .unwrap();
        assert_eq!(
            sql,
            "MERGE INTO ids t USING( VALUES (1),(2) ) AS s( id ) ON( t.id = s.id ) \
             WHEN NOT MATCHED THEN INSERT( id ) VALUES( s.id );"
        );
        let update_only = MergeRequest::values("ids", "id", "id", &values).ignore_insert(true);
        assert!(D.merge(&update_only).is_err());
    }

    #[test]
    fn isolation() {
        assert_eq!(
            D.isolation_sql(IsolationLevel::Serializable).unwrap(),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"
        );
        assert!(D.isolation_sql(IsolationLevel::None).is_err());
        assert_eq!(D.parse_isolation(&RowValues::Int(1)), IsolationLevel::ReadUncommitted);
        assert_eq!(D.parse_isolation(&RowValues::Int(2)), IsolationLevel::ReadCommitted);
        assert_eq!(D.parse_isolation(&RowValues::Int(3)), IsolationLevel::RepeatableRead);
        assert_eq!(D.parse_isolation(&RowValues::Int(4)), IsolationLevel::Serializable);
        assert_eq!(D.parse_isolation(&RowValues::Int(5)), IsolationLevel::ReadCommitted);
        assert_eq!(D.parse_isolation(&RowValues::Null), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn next_key_query() {
        assert_eq!(
            D.next_key_sql("orders", 10, "id"),
            "SELECT isnull( max( id ), 0 ) + 10 AS next_key FROM orders"
        );
    }
}
