use serde::{Deserialize, Serialize};

/// Shape of one table column as reported by a dialect's metadata catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table: String,
    pub name: String,
    /// Native type name, lower-cased (`varchar`, `int`, `nvarchar`, ...).
    pub data_type: String,
    /// Character length or numeric precision, whichever the catalog reports.
    pub length: Option<i64>,
    pub nullable: bool,
    pub default: Option<String>,
    pub collation: Option<String>,
}

impl ColumnInfo {
    /// Does the column have the given type (case-insensitive)?
    pub fn is_type(&self, data_type: &str) -> bool {
        self.data_type.eq_ignore_ascii_case(data_type)
    }
}
