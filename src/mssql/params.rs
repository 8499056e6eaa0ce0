use std::borrow::Cow;

use tiberius::{ColumnData, ToSql};

use crate::statement::BindValue;

/// ToSql for BindValue for passing parameters
impl ToSql for BindValue {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            BindValue::Int(i) => ColumnData::I64(Some(*i)),
            BindValue::Float(f) => ColumnData::F64(Some(*f)),
            BindValue::Text(s) => ColumnData::String(Some(Cow::from(s.as_str()))),
            BindValue::Bytes(bytes) => ColumnData::Binary(Some(Cow::from(bytes.as_slice()))),
            BindValue::Null => ColumnData::String(None),
        }
    }
}

/// Borrow bound values as tiberius parameters.
pub(super) fn as_refs(values: &[BindValue]) -> Vec<&dyn ToSql> {
    values.iter().map(|v| v as &dyn ToSql).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_native_types() {
        assert!(matches!(BindValue::Int(5).to_sql(), ColumnData::I64(Some(5))));
        assert!(matches!(BindValue::Null.to_sql(), ColumnData::String(None)));
        match BindValue::Text("abc".into()).to_sql() {
            ColumnData::String(Some(s)) => assert_eq!(s, "abc"),
            other => panic!("unexpected {other:?}"),
        }
        match BindValue::Bytes(vec![1, 2]).to_sql() {
            ColumnData::Binary(Some(b)) => assert_eq!(b.as_ref(), &[1, 2]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn refs_keep_order() {
        let values = [BindValue::Int(1), BindValue::Float(2.5)];
        let refs = as_refs(&values);
        assert_eq!(refs.len(), 2);
        assert!(matches!(refs[1].to_sql(), ColumnData::F64(Some(f)) if f == 2.5));
    }
}
