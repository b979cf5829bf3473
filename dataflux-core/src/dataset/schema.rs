//! Schema definition and type inference for datasets.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::Value;

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
    /// Every value in the column is missing.
    Null,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Boolean)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Boolean => "boolean",
            ColumnType::Null => "null",
        };
        f.write_str(name)
    }
}

/// Schema definition for a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: Vec<ColumnSchema>,
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
    pub nullable: bool,
}

/// Summary statistics for a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub dtype: ColumnType,
    pub null_count: usize,
    pub unique_count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Infer the type of a column from its values.
///
/// Nulls are ignored. Integers mixed with floats widen to `Float`; any other
/// mix of types falls back to `String`.
pub fn infer_column_type(values: &[Value]) -> ColumnType {
    let mut inferred: Option<ColumnType> = None;

    for v in values {
        let Some(t) = v.column_type() else { continue };
        inferred = Some(match inferred {
            None => t,
            Some(current) if current == t => current,
            Some(current) if current.is_numeric() && t.is_numeric() => ColumnType::Float,
            Some(_) => return ColumnType::String,
        });
    }

    inferred.unwrap_or(ColumnType::Null)
}
