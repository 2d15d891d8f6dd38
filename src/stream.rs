//! Row batch streams
//!
//! A [`RowBatchStream`] yields a table's rows as a finite, non-restartable run
//! of bounded batches. It decouples the codecs from however the storage engine
//! holds rows.

use async_trait::async_trait;

use crate::models::{Row, RowBatch};
use crate::storage::StorageResult;

/// Lazy sequence of row batches
#[async_trait]
pub trait RowBatchStream: Send {
    /// Next batch, or `None` once the stream is exhausted
    async fn next_batch(&mut self) -> StorageResult<Option<RowBatch>>;
}

/// Stream over rows already held in memory, cut into batches of `batch_size`
#[derive(Debug)]
pub struct VecBatchStream {
    rows: std::vec::IntoIter<Row>,
    batch_size: usize,
}

impl VecBatchStream {
    pub fn new(rows: Vec<Row>, batch_size: usize) -> Self {
        Self {
            rows: rows.into_iter(),
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl RowBatchStream for VecBatchStream {
    async fn next_batch(&mut self) -> StorageResult<Option<RowBatch>> {
        let batch: RowBatch = self.rows.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}

/// Drain a stream into a single batch
pub async fn collect_batches(stream: &mut dyn RowBatchStream) -> StorageResult<RowBatch> {
    let mut rows = Vec::new();
    while let Some(batch) = stream.next_batch().await? {
        rows.extend(batch);
    }
    Ok(RowBatch::new(rows))
}
