#![allow(dead_code)]

use chrono::NaiveDate;
use dbconn::prelude::*;

/// Settings from `var`: a path to a JSON connection document, or the document itself.
/// `None` when the variable is unset, so database tests skip on machines without one.
pub fn config_from_env(var: &str) -> Option<ConnectionConfig> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let value = std::env::var(var).ok()?;
    let json = if value.trim_start().starts_with('{') {
        value
    } else {
        std::fs::read_to_string(&value).unwrap_or_else(|e| panic!("{var}: cannot read {value}: {e}"))
    };
    let mut config = ConnectionConfig::from_json(&json).unwrap_or_else(|e| panic!("{var}: {e}"));
    config.settings = SettingsTable {
        table: "dbconn_settings".to_string(),
        key_column: "setting_key".to_string(),
        value_column: "setting_value".to_string(),
    };
    Some(config)
}

pub fn count(conn: &mut dyn Connection, table: &str) -> Result<i64, DbConnError> {
    let value = conn.get_field(&format!("SELECT count(*) FROM {table}"), None)?;
    Ok(value.and_then(|v| v.to_i64()).unwrap_or(-1))
}

/// Behaviour every backend shares. Expects `dbconn_items( id INT PRIMARY KEY,
/// name VARCHAR(100) NULL, qty INT NULL )` to exist and be empty, and the settings table
/// `dbconn_settings( setting_key VARCHAR(50) PRIMARY KEY, setting_value VARCHAR(200) NULL )`.
pub fn exercise_connection(conn: &mut dyn Connection) -> Result<(), DbConnError> {
    // Next key on an empty table.
    assert_eq!(conn.get_next_key("dbconn_items", 1, "id")?, 1);

    // Prepared inserts.
    {
        let mut stmt = conn.prepare("INSERT INTO dbconn_items( id, name, qty ) VALUES( ?, ?, ? )")?;
        assert_eq!(stmt.param_count(), 3);
        for (id, name) in [(1, "one"), (2, "two"), (3, "three")] {
            assert_eq!(stmt.execute(&[id.into(), name.into(), RowValues::Null])?, 1);
        }
        assert!(matches!(
            stmt.execute(&[RowValues::Int(4)]),
            Err(DbConnError::ParameterError(_))
        ));
    }
    assert_eq!(count(conn, "dbconn_items")?, 3);

    // Quote round trip through the formatter.
    let tricky = RowValues::from("O'Brien \\ \"quoted\"");
    let literal = conn.format(&tricky, false, None)?;
    conn.exec_sql(&format!("UPDATE dbconn_items SET name = {literal} WHERE id = 1"))?;
    assert_eq!(conn.get_rows_affected(), 1);
    let stored = conn.get_field("SELECT name FROM dbconn_items WHERE id = 1", Some("name"))?;
    assert_eq!(stored, Some(tricky));

    // NULL conditions.
    let null_cond = conn.format_cond(&RowValues::Null, "=", false, None)?;
    assert_eq!(null_cond, " IS NULL");
    let rows = conn.get_data_packet(
        &format!("SELECT id FROM dbconn_items WHERE qty{null_cond} ORDER BY id"),
        false,
    )?;
    assert_eq!(rows.len(), 3);

    // Limit caps the rows returned.
    let limited = conn.limit("SELECT id, name FROM dbconn_items ORDER BY id", 2, None);
    let rows = conn.get_data_packet(&limited, true)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("id"), Some(&RowValues::Int(1)));
    let paged = conn.limit("SELECT id FROM dbconn_items ORDER BY id", 1, Some(2));
    assert_eq!(conn.get_field(&paged, None)?, Some(RowValues::Int(3)));

    // Cursors.
    {
        let mut cursor = conn.get_cursor("SELECT id, name FROM dbconn_items ORDER BY id", None, false)?;
        assert_eq!(cursor.num_fields(), 2);
        assert_eq!(cursor.column_names(), ["id", "name"]);
        let first = cursor.next(Some(FetchShape::Both))?.expect("first row");
        assert_eq!(first.get_by_index(0), Some(&RowValues::Int(1)));
        assert_eq!(first.get("id"), Some(&RowValues::Int(1)));
        let info = cursor.fields_info()?;
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].name, "id");
        cursor.close()?;
        cursor.close()?;
        assert!(cursor.is_closed());
        assert!(cursor.next(None)?.is_none());
    }

    // Upserts are idempotent.
    let merge = conn.get_merge_values(
        "dbconn_items",
        "id",
        "id,name,qty",
        &["(2, 'deux', 20)", "(4, 'four', 40)"],
        false,
        None,
    )?;
    assert_eq!(
        merge,
        conn.get_merge_values(
            "dbconn_items",
            "id",
            "id,name,qty",
            &["(2, 'deux', 20)", "(4, 'four', 40)"],
            false,
            None,
        )?
    );
    conn.exec_sql(&merge)?;
    conn.exec_sql(&merge)?;
    assert_eq!(count(conn, "dbconn_items")?, 4);
    assert_eq!(
        conn.get_field("SELECT qty FROM dbconn_items WHERE id = 2", None)?,
        Some(RowValues::Int(20))
    );

    // Update-only merge leaves missing keys alone.
    let update_only = conn.get_merge_values(
        "dbconn_items",
        "id",
        "id,qty",
        &["(4, 44)", "(9, 99)"],
        true,
        None,
    )?;
    conn.exec_sql(&update_only)?;
    assert_eq!(count(conn, "dbconn_items")?, 4);
    assert_eq!(
        conn.get_field("SELECT qty FROM dbconn_items WHERE id = 4", None)?,
        Some(RowValues::Int(44))
    );

    // Next key after the current maximum.
    conn.exec_sql("INSERT INTO dbconn_items( id, name ) VALUES( 41, 'forty-one' )")?;
    assert_eq!(conn.get_next_key("dbconn_items", 1, "id")?, 42);

    // Transactions.
    conn.begin_trans()?;
    assert!(conn.in_transaction());
    assert!(matches!(conn.begin_trans(), Err(DbConnError::TransactionError(_))));
    conn.exec_sql("DELETE FROM dbconn_items WHERE id = 41")?;
    conn.rollback()?;
    assert!(!conn.in_transaction());
    assert_eq!(count(conn, "dbconn_items")?, 5);
    assert!(matches!(conn.commit(), Err(DbConnError::TransactionError(_))));
    assert!(conn.last_error().is_some());

    conn.begin_trans()?;
    conn.exec_sql("DELETE FROM dbconn_items WHERE id = 41")?;
    conn.commit()?;
    assert_eq!(count(conn, "dbconn_items")?, 4);
    assert!(conn.last_error().is_none());

    // Settings table.
    assert_eq!(conn.get_value("color")?, None);
    conn.set_value("color", &RowValues::from("blue"))?;
    conn.set_value("color", &RowValues::from("green"))?;
    assert_eq!(conn.get_value("color")?, Some(RowValues::from("green")));
    conn.set_value("color", &RowValues::Null)?;
    assert_eq!(conn.get_value("color")?, None);

    // Missing rows and columns.
    assert_eq!(conn.get_field("SELECT id FROM dbconn_items WHERE id = -1", None)?, None);
    assert!(matches!(
        conn.get_field("SELECT id FROM dbconn_items WHERE id = 1", Some("nope")),
        Err(DbConnError::NoResult(_))
    ));
    assert!(conn.exec_sql("SELECT * FROM dbconn_no_such_table").is_err());
    assert!(conn.last_error().is_some());
    Ok(())
}

fn select(conn: &mut dyn Connection, expr: &str) -> Result<RowValues, DbConnError> {
    Ok(conn
        .get_field(&format!("SELECT {expr} AS v"), None)?
        .unwrap_or(RowValues::Null))
}

/// Exact numerics arrive as text, floats and integers as themselves.
#[allow(clippy::cast_precision_loss)]
fn number(value: &RowValues) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_int().map(|i| *i as f64))
        .or_else(|| value.as_text().and_then(|s| s.trim().parse().ok()))
}

fn json(value: &RowValues) -> Option<serde_json::Value> {
    match value {
        RowValues::JSON(doc) => Some(doc.clone()),
        RowValues::Text(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

/// Every function renders differently per backend but must evaluate to the same value.
pub fn check_function_results(conn: &mut dyn Connection) -> Result<(), DbConnError> {
    let f = conn.get_functions();
    let day = |d: &str| f.cast(&format!("'{d}'"), CastType::Date, None, None);
    let int = |conn: &mut dyn Connection, expr: &str| -> Result<Option<i64>, DbConnError> {
        Ok(select(conn, expr)?.to_i64())
    };

    // 2022-01-01 is a Saturday, 2022-01-02 a Sunday.
    assert_eq!(int(conn, &f.date_extract(&day("2022-01-02"), DatePart::Year))?, Some(2022));
    assert_eq!(int(conn, &f.date_extract(&day("2022-01-01"), DatePart::DayOfWeek))?, Some(7));
    assert_eq!(int(conn, &f.date_extract(&day("2022-01-02"), DatePart::DayOfWeek))?, Some(1));
    assert_eq!(int(conn, &f.date_extract(&day("2022-01-01"), DatePart::WeekOfYear))?, Some(1));
    assert_eq!(int(conn, &f.date_extract(&day("2022-01-02"), DatePart::WeekOfYear))?, Some(2));
    assert_eq!(int(conn, &f.date_extract(&day("2024-12-31"), DatePart::WeekOfYear))?, Some(53));
    assert_eq!(int(conn, &f.date_extract(&day("2024-03-01"), DatePart::DayOfYear))?, Some(61));

    assert_eq!(int(conn, &f.greatest(&["3", "7", "5"]))?, Some(7));
    assert_eq!(int(conn, &f.least(&["3", "7", "5", "1"]))?, Some(1));
    assert_eq!(select(conn, &f.iif("2 > 1", "'yes'", "'no'"))?, RowValues::from("yes"));

    let equal = |a: &str, b: &str| f.iif(&f.null_safe_equal(a, b), "1", "0");
    assert_eq!(int(conn, &equal("NULL", "NULL"))?, Some(1));
    assert_eq!(int(conn, &equal("1", "NULL"))?, Some(0));
    assert_eq!(int(conn, &equal("1", "1"))?, Some(1));
    assert_eq!(int(conn, &f.ifnull("NULL", "5"))?, Some(5));

    assert_eq!(number(&select(conn, &f.trunc("2.789", 1))?), Some(2.7));
    assert_eq!(number(&select(conn, &f.trunc("-2.789", 1))?), Some(-2.7));
    assert_eq!(number(&select(conn, &f.round("2.75", 1))?), Some(2.8));

    let doc = f.cast(r#"'{"a": [1, 2]}'"#, CastType::Json, None, None);
    assert_eq!(json(&select(conn, &doc)?), Some(serde_json::json!({"a": [1, 2]})));

    let leap_day = NaiveDate::from_ymd_opt(2024, 2, 29)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(RowValues::Timestamp);
    let back_one_day = f.date_add(&day("2024-03-01"), DatePart::Day, "-1");
    assert_eq!(Some(select(conn, &back_one_day)?), leap_day);
    let back_one_month = f.date_add(&day("2024-03-31"), DatePart::Month, "-1");
    assert_eq!(Some(select(conn, &back_one_month)?), leap_day);

    assert_eq!(select(conn, &f.substr("'abcdef'", 2, 3))?, RowValues::from("bcd"));
    assert_eq!(select(conn, &f.concat(&["'ab'", "'cd'"]))?, RowValues::from("abcd"));
    assert_eq!(select(conn, &f.trim("'  x  '"))?, RowValues::from("x"));
    Ok(())
}
