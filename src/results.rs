pub mod data_row;
pub mod field_info;
pub mod row;

pub use data_row::DataRow;
pub use field_info::FieldInfo;
pub use row::CustomDbRow;
