use super::merge::{MergePlan, MergeRequest, MergeSource, split_tuples, values_clause};
use super::{Dialect, hex, no_isolation_keyword};
use crate::error::DbConnError;
use crate::functions::{Functions, MysqlFunctions};
use crate::placeholders::Flavor;
use crate::types::{DatabaseType, IsolationLevel, RowValues};

static FUNCTIONS: MysqlFunctions = MysqlFunctions;

/// MySQL / MariaDB syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect {
    no_backslash_escapes: bool,
}

impl MysqlDialect {
    /// Backslash escapes, the server default.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            no_backslash_escapes: false,
        }
    }

    /// For sessions whose `sql_mode` contains `NO_BACKSLASH_ESCAPES`: backslashes are
    /// ordinary characters and quotes are doubled.
    #[must_use]
    pub const fn without_backslash_escapes() -> Self {
        Self {
            no_backslash_escapes: true,
        }
    }

    /// Update-only merge: join the source rows to the target and update in place.
    fn update_join(
        &self,
        request: &MergeRequest<'_>,
        plan: &MergePlan,
    ) -> Result<String, DbConnError> {
        let set = match request.on_update {
            Some(custom) => custom.trim().to_string(),
            None => plan
                .update_fields
                .iter()
                .map(|f| format!("t.{f} = s.{f}"))
                .collect::<Vec<_>>()
                .join(","),
        };
        if set.is_empty() {
            return Err(MergePlan::nothing_to_update(request.table));
        }

        let source = match request.source {
            MergeSource::Select(select) => select.trim().to_string(),
            MergeSource::Values(values) => {
                let rows = split_tuples(values, Flavor::Mysql);
                if rows.is_empty() {
                    return Err(DbConnError::ParameterError(
                        "merge needs at least one value tuple".to_string(),
                    ));
                }
                let mut selects = Vec::with_capacity(rows.len());
                for row in rows {
                    if row.len() != plan.fields.len() {
                        return Err(DbConnError::ParameterError(format!(
                            "value tuple has {} items, expected {}",
                            row.len(),
                            plan.fields.len()
                        )));
                    }
                    let columns = row
                        .iter()
                        .zip(&plan.fields)
                        .map(|(v, f)| format!("{v} AS {f}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    selects.push(format!("SELECT {columns}"));
                }
                selects.join(" UNION ALL ")
            }
        };

        Ok(format!(
            "UPDATE {} t INNER JOIN ( {source} ) AS s ON( {} ) SET {set};",
            request.table,
            plan.condition()
        ))
    }
}

impl Dialect for MysqlDialect {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mysql
    }

    fn flavor(&self) -> Flavor {
        Flavor::Mysql
    }

    fn escape_str(&self, s: &str) -> String {
        if self.no_backslash_escapes {
            return s.replace('\'', "''");
        }
        let mut out = String::with_capacity(s.len() + 8);
        for c in s.chars() {
            match c {
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\x1a' => out.push_str("\\Z"),
                _ => out.push(c),
            }
        }
        out
    }

    fn binary_literal(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex(bytes))
    }

    fn limit(&self, sql: &str, limit: u64, offset: Option<u64>) -> String {
        match offset.filter(|o| *o > 0) {
            Some(offset) => format!("{sql} LIMIT {limit} OFFSET {offset}"),
            None => format!("{sql} LIMIT {limit}"),
        }
    }

    fn merge(&self, request: &MergeRequest<'_>) -> Result<String, DbConnError> {
        let plan = MergePlan::new(request)?;
        if request.ignore_insert {
            return self.update_join(request, &plan);
        }

        let source = match request.source {
            MergeSource::Select(select) => select.trim().to_string(),
            MergeSource::Values(values) => values_clause(values)?,
        };
        let updates = plan.update_list(request, &FUNCTIONS);
        let fields = plan.field_list();

        if updates.is_empty() {
            // Every field is a key: existing rows are already identical.
            Ok(format!(
                "INSERT IGNORE INTO {}( {fields} ) {source};",
                request.table
            ))
        } else {
            Ok(format!(
                "INSERT INTO {}( {fields} ) {source} ON DUPLICATE KEY UPDATE {updates};",
                request.table
            ))
        }
    }

    fn begin_sql(&self) -> &'static str {
        "START TRANSACTION"
    }

    fn commit_sql(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_sql(&self) -> &'static str {
        "ROLLBACK"
    }

    fn isolation_sql(&self, level: IsolationLevel) -> Result<String, DbConnError> {
        let keyword = level.keyword().ok_or_else(no_isolation_keyword)?;
        Ok(format!("SET SESSION TRANSACTION ISOLATION LEVEL {keyword}"))
    }

    fn read_isolation_sql(&self) -> &'static str {
        "SELECT @@transaction_isolation"
    }

    fn parse_isolation(&self, value: &RowValues) -> IsolationLevel {
        let text = match value {
            RowValues::Text(s) => s.clone(),
            RowValues::Blob(b) => String::from_utf8_lossy(b).into_owned(),
            _ => String::new(),
        };
        match text.trim().to_ascii_uppercase().replace(['-', '_'], " ").as_str() {
            "READ UNCOMMITTED" => IsolationLevel::ReadUncommitted,
            "READ COMMITTED" => IsolationLevel::ReadCommitted,
            "SERIALIZABLE" => IsolationLevel::Serializable,
            _ => IsolationLevel::RepeatableRead,
        }
    }

    fn next_key_sql(&self, source: &str, increment: i64, field: &str) -> String {
        format!("SELECT ifnull( max( {field} ), 0 ) + {increment} AS next_key FROM {source}")
    }

    fn functions(&self) -> &'static dyn Functions {
        &FUNCTIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: MysqlDialect = MysqlDialect::new();

    #[test]
    fn escapes_like_the_client_library() {
        assert_eq!(D.escape_str("O'Brien"), r"O\'Brien");
        assert_eq!(D.escape_str("a\\b\n\"c\"\0\x1a"), r#"a\\b\n\"c\"\0\Z"#);
        assert_eq!(D.quoted_str(&D.escape_str("it's")), r"'it\'s'");
    }

    #[test]
    fn doubles_quotes_without_backslash_escapes() {
        let d = MysqlDialect::without_backslash_escapes();
        assert_eq!(d.text_literal("O'Brien"), "'O''Brien'");
        assert_eq!(d.text_literal(r"C:\dir"), r"'C:\dir'");
        let req = MergeRequest::values("t", "id", "id,name", &["1,'a'"]);
        assert_eq!(d.merge(&req).unwrap(), D.merge(&req).unwrap());
    }

    #[test]
    fn binary_literal_is_hex() {
        assert_eq!(D.binary_literal(&[0xde, 0xad, 0x01]), "X'DEAD01'");
        assert_eq!(D.binary_literal(&[]), "X''");
    }

    #[test]
    fn limit_appends_clause() {
        assert_eq!(D.limit("select * from t", 10, None), "select * from t LIMIT 10");
        assert_eq!(D.limit("select * from t", 10, Some(0)), "select * from t LIMIT 10");
        assert_eq!(
            D.limit("select * from t", 10, Some(20)),
            "select * from t LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn merge_values_builds_on_duplicate_key() {
        let values = ["(1,'a'),(2,'b')"];
        let sql = D
            .merge(&MergeRequest::values("t", "id", "id, name, qty", &values))
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO t( id,name,qty ) VALUES (1,'a'),(2,'b') \
             ON DUPLICATE KEY UPDATE name = Values( name ),qty = Values( qty );"
        );
    }

    #[test]
    fn merge_is_deterministic() {
        let values = ["1,'a'"];
        let req = MergeRequest::values("t", "id", "id,name", &values);
        assert_eq!(D.merge(&req).unwrap(), D.merge(&req).unwrap());
    }

    #[test]
    fn merge_with_only_keys_inserts_ignoring_duplicates() {
        let sql = D
            .merge(&MergeRequest::select("tags", "a,b", "a,b", "select a, b from staging"))
            .unwrap();
        assert_eq!(sql, "INSERT IGNORE INTO tags( a,b ) select a, b from staging;");
    }

    #[test]
    fn merge_select_with_custom_update() {
        let req = MergeRequest::select("stock", "sku", "sku,qty", "select sku, qty from incoming")
            .on_update("qty = qty + Values( qty )");
        assert_eq!(
            D.merge(&req).unwrap(),
            "INSERT INTO stock( sku,qty ) select sku, qty from incoming \
             ON DUPLICATE KEY UPDATE qty = qty + Values( qty );"
        );
    }

    #[test]
    fn update_only_merge_from_select() {
        let req = MergeRequest::select("t", "id", "id,name", "select id, name from s2")
            .ignore_insert(true);
        assert_eq!(
            D.merge(&req).unwrap(),
            "UPDATE t t INNER JOIN ( select id, name from s2 ) AS s ON( t.id = s.id ) \
             SET t.name = s.name;"
        );
    }

    #[test]
    fn update_only_merge_from_values() {
        let values = ["(1,'a, b'),(2,'c')"];
        let req = MergeRequest::values("t", "id", "id,name", &values).ignore_insert(true);
        assert_eq!(
            D.merge(&req).unwrap(),
            "UPDATE t t INNER JOIN ( SELECT 1 AS id, 'a, b' AS name UNION ALL \
             SELECT 2 AS id, 'c' AS name ) AS s ON( t.id = s.id ) SET t.name = s.name;"
        );
    }

    #[test]
    fn update_only_merge_rejects_bad_input() {
        let values = ["1,'a',3"];
        let arity = MergeRequest::values("t", "id", "id,name", &values).ignore_insert(true);
        assert!(matches!(D.merge(&arity), Err(DbConnError::ParameterError(_))));

        let keys_only = MergeRequest::select("t", "id", "id", "select 1").ignore_insert(true);
        assert!(D.merge(&keys_only).is_err());
    }

    #[test]
    fn isolation_statements() {
        assert_eq!(
            D.isolation_sql(IsolationLevel::ReadCommitted).unwrap(),
            "SET SESSION TRANSACTION ISOLATION LEVEL READ COMMITTED"
        );
        assert!(matches!(
            D.isolation_sql(IsolationLevel::None),
            Err(DbConnError::TransactionError(_))
        ));
    }

    #[test]
    fn parses_server_isolation_names() {
        let parse = |s: &str| D.parse_isolation(&RowValues::Text(s.to_string()));
        assert_eq!(parse("READ-UNCOMMITTED"), IsolationLevel::ReadUncommitted);
        assert_eq!(parse("READ-COMMITTED"), IsolationLevel::ReadCommitted);
        assert_eq!(parse("REPEATABLE-READ"), IsolationLevel::RepeatableRead);
        assert_eq!(parse("SERIALIZABLE"), IsolationLevel::Serializable);
        assert_eq!(parse("???"), IsolationLevel::RepeatableRead);
        assert_eq!(
            D.parse_isolation(&RowValues::Blob(b"READ-COMMITTED".to_vec())),
            IsolationLevel::ReadCommitted
        );
    }

    #[test]
    fn next_key_query() {
        assert_eq!(
            D.next_key_sql("orders", 1, "id"),
            "SELECT ifnull( max( id ), 0 ) + 1 AS next_key FROM orders"
        );
    }
}
