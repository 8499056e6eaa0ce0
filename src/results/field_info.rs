use serde::Serialize;

/// Column metadata reported by a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    /// Backend type code (MySQL `MYSQL_TYPE_*` value, SQL Server `system_type_id`).
    pub type_code: i32,
    /// Backend type name, for display.
    pub type_name: String,
    pub size: Option<u64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: Option<bool>,
    /// Declared default. Neither backend reports it through a result set, so this is
    /// normally `None`.
    pub default: Option<String>,
}

impl FieldInfo {
    /// Metadata with only a name and type known.
    #[must_use]
    pub fn named(name: impl Into<String>, type_code: i32, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code,
            type_name: type_name.into(),
            size: None,
            precision: None,
            scale: None,
            nullable: None,
            default: None,
        }
    }
}
