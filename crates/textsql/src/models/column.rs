use serde::Serialize;
use std::fmt;

/// Relational type of an imported column.
///
/// Variants are ordered from most to least specific, so the wider of two
/// types is simply their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Text => "text",
        }
    }

    /// Map an engine or TBLN type name onto the closest column type.
    pub fn from_decl(decl: &str) -> Self {
        let decl = decl.trim().to_ascii_lowercase();
        if decl.contains("int") && !decl.contains("interval") && !decl.contains("point") {
            ColumnType::Integer
        } else if decl.contains("real")
            || decl.contains("floa")
            || decl.contains("doub")
            || decl.contains("numeric")
            || decl.contains("decimal")
        {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of a backing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// 1-based position within the table.
    pub ordinal: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            ty,
            ordinal,
        }
    }

    /// Positional name used when the input carries no header.
    pub fn positional_name(ordinal: usize) -> String {
        format!("c{}", ordinal)
    }
}

/// Column metadata of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    /// Declared type, when the engine knows it (expressions usually have none).
    pub decl_type: Option<ColumnType>,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, decl_type: Option<ColumnType>) -> Self {
        Self {
            name: name.into(),
            decl_type,
        }
    }
}
