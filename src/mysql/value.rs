use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::{Column, Row, Value};

use crate::results::FieldInfo;
use crate::statement::BindValue;
use crate::types::RowValues;

/// Character set id of binary strings.
const BINARY_CHARSET: u16 = 63;

/// Values of a fetched row, in column order.
pub(super) fn row_values(mut row: Row) -> Vec<RowValues> {
    let columns = row.columns();
    (0..row.len())
        .map(|i| {
            let value = row.take::<Value, usize>(i).unwrap_or(Value::NULL);
            to_row_value(value, &columns[i])
        })
        .collect()
}

/// Convert a server value. Text-protocol results arrive as bytes and are typed by the
/// column metadata.
pub(super) fn to_row_value(value: Value, column: &Column) -> RowValues {
    match value {
        Value::NULL => RowValues::Null,
        Value::Int(i) => RowValues::Int(i),
        Value::UInt(u) => i64::try_from(u).map_or_else(|_| RowValues::Text(u.to_string()), RowValues::Int),
        Value::Float(f) => RowValues::Float(f64::from(f)),
        Value::Double(d) => RowValues::Float(d),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|d| {
                    d.and_hms_micro_opt(u32::from(hour), u32::from(minute), u32::from(second), micros)
                })
                .map_or_else(
                    || {
                        // Zero dates have no calendar value.
                        RowValues::Text(format!(
                            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                        ))
                    },
                    RowValues::Timestamp,
                )
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = u64::from(days) * 24 + u64::from(hours);
            let mut text = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            if micros > 0 {
                text.push_str(&format!(".{micros:06}"));
            }
            RowValues::Text(text)
        }
        Value::Bytes(bytes) => from_text(bytes, column),
    }
}

fn from_text(bytes: Vec<u8>, column: &Column) -> RowValues {
    let text = || String::from_utf8_lossy(&bytes).into_owned();
    match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => {
            let s = text();
            s.parse::<i64>().map_or(RowValues::Text(s), RowValues::Int)
        }
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
            let s = text();
            s.parse::<f64>().map_or(RowValues::Text(s), RowValues::Float)
        }
        ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_DATETIME2
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_TIMESTAMP2 => {
            let s = text();
            NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                .map_or(RowValues::Text(s), RowValues::Timestamp)
        }
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
            let s = text();
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_or(RowValues::Text(s), |d| RowValues::Timestamp(d.and_time(chrono::NaiveTime::MIN)))
        }
        ColumnType::MYSQL_TYPE_JSON => serde_json::from_slice(&bytes)
            .map_or_else(|_| RowValues::Text(text()), RowValues::JSON),
        ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_GEOMETRY => RowValues::Blob(bytes),
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB
        | ColumnType::MYSQL_TYPE_VAR_STRING
        | ColumnType::MYSQL_TYPE_VARCHAR
        | ColumnType::MYSQL_TYPE_STRING
            if column.character_set() == BINARY_CHARSET =>
        {
            RowValues::Blob(bytes)
        }
        // DECIMAL stays text to keep every digit.
        _ => match String::from_utf8(bytes) {
            Ok(s) => RowValues::Text(s),
            Err(e) => RowValues::Blob(e.into_bytes()),
        },
    }
}

pub(super) fn to_mysql_value(value: BindValue) -> Value {
    match value {
        BindValue::Int(i) => Value::Int(i),
        BindValue::Float(f) => Value::Double(f),
        BindValue::Text(s) => Value::Bytes(s.into_bytes()),
        BindValue::Bytes(b) => Value::Bytes(b),
        BindValue::Null => Value::NULL,
    }
}

pub(super) fn field_info(column: &Column) -> FieldInfo {
    let column_type = column.column_type();
    let type_name = format!("{column_type:?}")
        .trim_start_matches("MYSQL_TYPE_")
        .to_ascii_lowercase();
    let decimal = matches!(
        column_type,
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL
    );

    let mut info = FieldInfo::named(column.name_str(), column_type as i32, type_name);
    info.size = Some(u64::from(column.column_length()));
    info.precision = decimal.then(|| column.column_length());
    info.scale = Some(u32::from(column.decimals()));
    info.nullable = Some(!column.flags().contains(ColumnFlags::NOT_NULL_FLAG));
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(column_type: ColumnType) -> Column {
        Column::new(column_type).with_name(b"c")
    }

    #[test]
    fn text_protocol_values_follow_column_types() {
        let int = column(ColumnType::MYSQL_TYPE_LONG);
        assert_eq!(to_row_value(Value::Bytes(b"42".to_vec()), &int), RowValues::Int(42));

        let dbl = column(ColumnType::MYSQL_TYPE_DOUBLE);
        assert_eq!(to_row_value(Value::Bytes(b"1.5".to_vec()), &dbl), RowValues::Float(1.5));

        let dec = column(ColumnType::MYSQL_TYPE_NEWDECIMAL);
        assert_eq!(
            to_row_value(Value::Bytes(b"10.25".to_vec()), &dec),
            RowValues::Text("10.25".into())
        );

        let ts = column(ColumnType::MYSQL_TYPE_DATETIME);
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        assert_eq!(
            to_row_value(Value::Bytes(b"2024-05-06 07:08:09".to_vec()), &ts),
            RowValues::Timestamp(expected)
        );
        assert_eq!(
            to_row_value(Value::Bytes(b"0000-00-00 00:00:00".to_vec()), &ts),
            RowValues::Text("0000-00-00 00:00:00".into())
        );

        let json = column(ColumnType::MYSQL_TYPE_JSON);
        assert_eq!(
            to_row_value(Value::Bytes(br#"{"a":1}"#.to_vec()), &json),
            RowValues::JSON(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn binary_protocol_values() {
        let any = column(ColumnType::MYSQL_TYPE_LONGLONG);
        assert_eq!(to_row_value(Value::NULL, &any), RowValues::Null);
        assert_eq!(to_row_value(Value::Int(-3), &any), RowValues::Int(-3));
        assert_eq!(
            to_row_value(Value::UInt(u64::MAX), &any),
            RowValues::Text(u64::MAX.to_string())
        );
        assert_eq!(
            to_row_value(Value::Time(true, 1, 2, 3, 4, 0), &any),
            RowValues::Text("-26:03:04".into())
        );
    }

    #[test]
    fn binds_values_natively() {
        assert_eq!(to_mysql_value(BindValue::Int(1)), Value::Int(1));
        assert_eq!(to_mysql_value(BindValue::Text("a".into())), Value::Bytes(b"a".to_vec()));
        assert_eq!(to_mysql_value(BindValue::Null), Value::NULL);
    }

    #[test]
    fn describes_columns() {
        let col = Column::new(ColumnType::MYSQL_TYPE_NEWDECIMAL)
            .with_name(b"price")
            .with_column_length(10)
            .with_decimals(2)
            .with_flags(ColumnFlags::NOT_NULL_FLAG);
        let info = field_info(&col);
        assert_eq!(info.name, "price");
        assert_eq!(info.type_name, "newdecimal");
        assert_eq!(info.type_code, ColumnType::MYSQL_TYPE_NEWDECIMAL as i32);
        assert_eq!(info.precision, Some(10));
        assert_eq!(info.scale, Some(2));
        assert_eq!(info.nullable, Some(false));
        assert_eq!(info.default, None);
    }
}
