//! Rows and row batches
//!
//! A [`Row`] holds one value per column, positioned as in the table schema it was
//! built or decoded against. A [`RowBatch`] is a bounded run of rows handed off by
//! move between the codec and the storage adapter.

use serde::{Deserialize, Serialize};

use super::schema::TableSchema;
use super::value::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Check the row against a schema: arity, types and required columns.
    pub fn check(&self, schema: &TableSchema) -> Result<(), String> {
        if self.values.len() != schema.len() {
            return Err(format!(
                "row has {} values but table '{}' has {} columns",
                self.values.len(),
                schema.name,
                schema.len()
            ));
        }
        for (value, column) in self.values.iter().zip(&schema.columns) {
            match value.data_type() {
                None if column.is_required() => {
                    return Err(format!("column '{}' cannot be null", column.name));
                }
                None => {}
                Some(found) if found != column.data_type => {
                    return Err(format!(
                        "column '{}' expects {}, found {}",
                        column.name, column.data_type, found
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowBatch {
    pub rows: Vec<Row>,
}

impl RowBatch {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Split into batches of at most `batch_size` rows, preserving order
    pub fn into_chunks(self, batch_size: usize) -> Vec<RowBatch> {
        let batch_size = batch_size.max(1);
        let mut chunks = Vec::with_capacity(self.rows.len().div_ceil(batch_size));
        let mut rows = self.rows.into_iter().peekable();
        while rows.peek().is_some() {
            chunks.push(RowBatch::new(rows.by_ref().take(batch_size).collect()));
        }
        chunks
    }
}

impl IntoIterator for RowBatch {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl FromIterator<Row> for RowBatch {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
