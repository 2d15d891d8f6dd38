//! In-memory storage engine

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{StorageError, StorageResult, TableCatalog, TableStorage};
use crate::models::{Row, RowBatch, TableSchema};
use crate::stream::{RowBatchStream, VecBatchStream};

#[derive(Debug)]
struct MemoryTable {
    schema: Arc<TableSchema>,
    rows: Vec<Row>,
}

/// Catalog and row storage held in memory.
///
/// Inserts validate the whole batch before appending any row, so a batch is
/// either fully stored or not stored at all.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty table
    pub async fn create_table(&self, schema: TableSchema) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(&schema.name) {
            return Err(StorageError::TableExists(schema.name));
        }
        debug!("Created table {}", schema.name);
        tables.insert(
            schema.name.clone(),
            MemoryTable {
                schema: Arc::new(schema),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    pub async fn row_count(&self, table: &str) -> StorageResult<usize> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))
    }

    /// All rows of `table` ordered by its time index column. Rows with equal
    /// timestamps keep insertion order.
    pub async fn scan_ordered_by_time_index(&self, table: &str) -> StorageResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let table_data = tables
            .get(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;

        let mut rows = table_data.rows.clone();
        if let Ok(index) = table_data.schema.time_index_position() {
            rows.sort_by_key(|row| row.get(index).and_then(|v| v.as_timestamp()));
        }
        Ok(rows)
    }
}

#[async_trait]
impl TableCatalog for MemoryDatabase {
    async fn get_table_schema(&self, table: &str) -> StorageResult<Arc<TableSchema>> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| Arc::clone(&t.schema))
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))
    }
}

#[async_trait]
impl TableStorage for MemoryDatabase {
    async fn stream_rows(
        &self,
        table: &str,
        batch_size: usize,
    ) -> StorageResult<Box<dyn RowBatchStream>> {
        let tables = self.tables.read().await;
        let table_data = tables
            .get(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        Ok(Box::new(VecBatchStream::new(
            table_data.rows.clone(),
            batch_size,
        )))
    }

    async fn insert_rows(&self, table: &str, batch: RowBatch) -> StorageResult<usize> {
        let mut tables = self.tables.write().await;
        let table_data = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;

        for (i, row) in batch.iter().enumerate() {
            row.check(&table_data.schema)
                .map_err(|reason| StorageError::InvalidRows {
                    table: table.to_string(),
                    reason: format!("row {}: {}", i, reason),
                })?;
        }

        let count = batch.len();
        table_data.rows.extend(batch);
        Ok(count)
    }
}
