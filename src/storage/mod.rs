//! Storage interfaces
//!
//! The catalog and the storage engine are external collaborators. A copy
//! consumes them through two traits:
//! - [`TableCatalog`]: schema lookup, done before any copy work starts
//! - [`TableStorage`]: streaming reads for export, batch inserts for import
//!
//! [`MemoryDatabase`] implements both and serves as the reference engine.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{RowBatch, TableSchema};
use crate::stream::RowBatchStream;

pub use memory::MemoryDatabase;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Table does not exist in the catalog
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Table already exists in the catalog
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// Rows were rejected by the table
    #[error("Invalid rows for table '{table}': {reason}")]
    InvalidRows { table: String, reason: String },

    /// Write failed inside the engine
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Read failed inside the engine
    #[error("Read failed: {0}")]
    ReadFailed(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Schema lookup
#[async_trait]
pub trait TableCatalog: Send + Sync {
    /// Schema of `table`, or [`StorageError::TableNotFound`]
    async fn get_table_schema(&self, table: &str) -> StorageResult<Arc<TableSchema>>;
}

/// Row storage of the database engine
#[async_trait]
pub trait TableStorage: Send + Sync {
    /// Stream every row of `table` in batches of at most `batch_size` rows
    async fn stream_rows(
        &self,
        table: &str,
        batch_size: usize,
    ) -> StorageResult<Box<dyn RowBatchStream>>;

    /// Insert a batch atomically, returning the number of rows stored
    async fn insert_rows(&self, table: &str, batch: RowBatch) -> StorageResult<usize>;
}

#[async_trait]
impl<T: TableCatalog + ?Sized> TableCatalog for Arc<T> {
    async fn get_table_schema(&self, table: &str) -> StorageResult<Arc<TableSchema>> {
        (**self).get_table_schema(table).await
    }
}

#[async_trait]
impl<T: TableStorage + ?Sized> TableStorage for Arc<T> {
    async fn stream_rows(
        &self,
        table: &str,
        batch_size: usize,
    ) -> StorageResult<Box<dyn RowBatchStream>> {
        (**self).stream_rows(table, batch_size).await
    }

    async fn insert_rows(&self, table: &str, batch: RowBatch) -> StorageResult<usize> {
        (**self).insert_rows(table, batch).await
    }
}
