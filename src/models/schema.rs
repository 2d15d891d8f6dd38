//! Table schema types
//!
//! A [`TableSchema`] is borrowed from the catalog for the duration of a copy
//! and never mutated by it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int64,
    Float64,
    Boolean,
    /// Millisecond precision instant, stored as epoch milliseconds
    Timestamp,
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "text" | "varchar" => Ok(ColumnType::String),
            "int64" | "bigint" | "int" | "integer" => Ok(ColumnType::Int64),
            "float64" | "double" | "float" => Ok(ColumnType::Float64),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "timestamp" => Ok(ColumnType::Timestamp),
            _ => Err(format!("Unknown column type: {}", s)),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Int64 => write!(f, "int64"),
            ColumnType::Float64 => write!(f, "float64"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Role a column plays in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    #[default]
    Normal,
    TimeIndex,
}

/// A single column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: ColumnType,
    #[serde(default)]
    pub role: ColumnRole,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSchema {
    /// Create a nullable normal column
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
            role: ColumnRole::Normal,
            nullable: true,
        }
    }

    /// Create the time index column of a table. Time index values are never null.
    pub fn time_index(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: ColumnType::Timestamp,
            role: ColumnRole::TimeIndex,
            nullable: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn is_time_index(&self) -> bool {
        self.role == ColumnRole::TimeIndex
    }

    /// Whether a decoded row must carry a value for this column
    pub fn is_required(&self) -> bool {
        self.is_time_index() || !self.nullable
    }
}

/// Reasons a schema cannot take part in a copy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("table '{0}' has no time index column")]
    MissingTimeIndex(String),
    #[error("table '{table}' has more than one time index column: {columns:?}")]
    MultipleTimeIndexes { table: String, columns: Vec<String> },
    #[error("time index column '{column}' of table '{table}' must be a timestamp, found {found}")]
    TimeIndexType {
        table: String,
        column: String,
        found: ColumnType,
    },
    #[error("table '{table}' declares column '{column}' more than once")]
    DuplicateColumn { table: String, column: String },
}

/// Ordered column definitions of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the single time index column.
    ///
    /// Every table referenced by a copy must have exactly one time index column
    /// of timestamp type and unique column names.
    pub fn time_index_position(&self) -> Result<usize, SchemaError> {
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }

        let indexes: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_time_index())
            .map(|(i, _)| i)
            .collect();

        match indexes.as_slice() {
            [] => Err(SchemaError::MissingTimeIndex(self.name.clone())),
            [index] => {
                let column = &self.columns[*index];
                if column.data_type != ColumnType::Timestamp {
                    return Err(SchemaError::TimeIndexType {
                        table: self.name.clone(),
                        column: column.name.clone(),
                        found: column.data_type,
                    });
                }
                Ok(*index)
            }
            _ => Err(SchemaError::MultipleTimeIndexes {
                table: self.name.clone(),
                columns: indexes
                    .iter()
                    .map(|i| self.columns[*i].name.clone())
                    .collect(),
            }),
        }
    }

    pub fn time_index(&self) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.is_time_index())
    }
}
