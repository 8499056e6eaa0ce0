use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{Column, ColumnData, ColumnType, FromSql, Row};

use crate::results::FieldInfo;
use crate::types::RowValues;

/// Column metadata query; reports declared sizes and nullability the TDS stream omits.
pub(super) const DESCRIBE_SQL: &str = "SELECT name, system_type_id, system_type_name, \
     max_length, precision, scale, is_nullable \
     FROM sys.dm_exec_describe_first_result_set(@P1, NULL, 0) ORDER BY column_ordinal";

/// Values of a fetched row, in column order.
pub(super) fn row_values(row: Row) -> Vec<RowValues> {
    row.into_iter().map(to_row_value).collect()
}

/// Convert a TDS value.
#[allow(unreachable_patterns)]
pub(super) fn to_row_value(data: ColumnData<'static>) -> RowValues {
    match &data {
        ColumnData::U8(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map_or(RowValues::Null, RowValues::Int),
        ColumnData::F32(v) => v.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map_or(RowValues::Null, RowValues::Float),
        ColumnData::Bit(v) => v.map_or(RowValues::Null, RowValues::Bool),
        ColumnData::String(v) => v
            .as_ref()
            .map_or(RowValues::Null, |s| RowValues::Text(s.to_string())),
        ColumnData::Guid(v) => v.as_ref().map_or(RowValues::Null, |g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v
            .as_ref()
            .map_or(RowValues::Null, |b| RowValues::Blob(b.to_vec())),
        // Kept as text so no digits are lost.
        ColumnData::Numeric(v) => v.as_ref().map_or(RowValues::Null, |n| RowValues::Text(n.to_string())),
        ColumnData::Xml(v) => v.as_ref().map_or(RowValues::Null, |x| {
            RowValues::Text(x.clone().into_owned().into_string())
        }),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            converted(NaiveDateTime::from_sql(&data), RowValues::Timestamp)
        }
        ColumnData::Date(_) => converted(NaiveDate::from_sql(&data), |d| {
            RowValues::Timestamp(d.and_time(NaiveTime::MIN))
        }),
        ColumnData::Time(_) => converted(NaiveTime::from_sql(&data), |t| {
            RowValues::Text(t.format("%H:%M:%S%.f").to_string())
        }),
        ColumnData::DateTimeOffset(_) => converted(DateTime::<FixedOffset>::from_sql(&data), |d| {
            RowValues::Text(d.to_rfc3339())
        }),
        _ => RowValues::Null,
    }
}

fn converted<T>(value: tiberius::Result<Option<T>>, f: impl FnOnce(T) -> RowValues) -> RowValues {
    match value {
        Ok(Some(v)) => f(v),
        _ => RowValues::Null,
    }
}

/// `sys.types` id and name for a TDS column type.
#[allow(unreachable_patterns)]
pub(super) fn system_type(column_type: ColumnType) -> (i32, &'static str) {
    match column_type {
        ColumnType::Null => (0, "null"),
        ColumnType::Bit | ColumnType::Bitn => (104, "bit"),
        ColumnType::Int1 => (48, "tinyint"),
        ColumnType::Int2 => (52, "smallint"),
        ColumnType::Int4 | ColumnType::Intn => (56, "int"),
        ColumnType::Int8 => (127, "bigint"),
        ColumnType::Float4 => (59, "real"),
        ColumnType::Float8 | ColumnType::Floatn => (62, "float"),
        ColumnType::Money => (60, "money"),
        ColumnType::Money4 => (122, "smallmoney"),
        ColumnType::Datetime | ColumnType::Datetimen => (61, "datetime"),
        ColumnType::Datetime4 => (58, "smalldatetime"),
        ColumnType::Guid => (36, "uniqueidentifier"),
        ColumnType::Decimaln => (106, "decimal"),
        ColumnType::Numericn => (108, "numeric"),
        ColumnType::Daten => (40, "date"),
        ColumnType::Timen => (41, "time"),
        ColumnType::Datetime2 => (42, "datetime2"),
        ColumnType::DatetimeOffsetn => (43, "datetimeoffset"),
        ColumnType::BigVarBin => (165, "varbinary"),
        ColumnType::BigVarChar => (167, "varchar"),
        ColumnType::BigBinary => (173, "binary"),
        ColumnType::BigChar => (175, "char"),
        ColumnType::NVarchar => (231, "nvarchar"),
        ColumnType::NChar => (239, "nchar"),
        ColumnType::Xml => (241, "xml"),
        ColumnType::Udt => (240, "udt"),
        ColumnType::Text => (35, "text"),
        ColumnType::Image => (34, "image"),
        ColumnType::NText => (99, "ntext"),
        ColumnType::SSVariant => (98, "sql_variant"),
        _ => (-1, "unknown"),
    }
}

/// Metadata from the result stream alone: name and type.
pub(super) fn stream_field_info(column: &Column) -> FieldInfo {
    let (code, name) = system_type(column.column_type());
    FieldInfo::named(column.name(), code, name)
}

/// One row of [`DESCRIBE_SQL`].
pub(super) fn described_field_info(row: &Row) -> tiberius::Result<FieldInfo> {
    let name = row.try_get::<&str, _>("name")?.unwrap_or_default();
    let code = row.try_get::<i32, _>("system_type_id")?.unwrap_or_default();
    let type_name = row
        .try_get::<&str, _>("system_type_name")?
        .unwrap_or_default();
    let mut info = FieldInfo::named(name, code, type_name);
    // -1 marks (max) types.
    info.size = row
        .try_get::<i16, _>("max_length")?
        .and_then(|len| u64::try_from(len).ok());
    info.precision = row.try_get::<u8, _>("precision")?.map(u32::from);
    info.scale = row.try_get::<u8, _>("scale")?.map(u32::from);
    info.nullable = row.try_get::<bool, _>("is_nullable")?;
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use tiberius::numeric::Numeric;

    #[test]
    fn converts_scalars() {
        assert_eq!(to_row_value(ColumnData::I32(Some(7))), RowValues::Int(7));
        assert_eq!(to_row_value(ColumnData::U8(Some(255))), RowValues::Int(255));
        assert_eq!(to_row_value(ColumnData::I64(None)), RowValues::Null);
        assert_eq!(to_row_value(ColumnData::F64(Some(0.5))), RowValues::Float(0.5));
        assert_eq!(to_row_value(ColumnData::Bit(Some(true))), RowValues::Bool(true));
        assert_eq!(
            to_row_value(ColumnData::String(Some(Cow::Owned("x".to_string())))),
            RowValues::Text("x".into())
        );
        assert_eq!(
            to_row_value(ColumnData::Binary(Some(Cow::Owned(vec![0xCA, 0xFE])))),
            RowValues::Blob(vec![0xCA, 0xFE])
        );
        assert_eq!(to_row_value(ColumnData::DateTime(None)), RowValues::Null);
    }

    #[test]
    fn numeric_keeps_scale() {
        let n = Numeric::new_with_scale(12345, 2);
        assert_eq!(
            to_row_value(ColumnData::Numeric(Some(n))),
            RowValues::Text("123.45".into())
        );
    }

    #[test]
    fn maps_system_types() {
        assert_eq!(system_type(ColumnType::Int4), (56, "int"));
        assert_eq!(system_type(ColumnType::NVarchar), (231, "nvarchar"));
        assert_eq!(system_type(ColumnType::Datetime2), (42, "datetime2"));
        assert_eq!(system_type(ColumnType::Decimaln), (106, "decimal"));
    }
}
