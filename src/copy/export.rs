//! Table to file

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{CancellationFlag, CopyError, CopyResult};
use crate::codec::Format;
use crate::models::TableSchema;
use crate::storage::TableStorage;

/// Stream every row of `table` into `path`, overwriting it.
///
/// Batches are encoded and written strictly in stream order. The source table
/// is never modified.
pub(super) async fn export_table<S: TableStorage + ?Sized>(
    storage: &S,
    table: &str,
    schema: &TableSchema,
    path: &Path,
    format: Format,
    batch_size: usize,
    cancel: &CancellationFlag,
) -> Result<CopyResult, CopyError> {
    let mut stream = storage.stream_rows(table, batch_size).await?;
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| CopyError::io(path, e))?;
    let mut encoder = format.encoder(schema);
    let encode_err = |e: crate::codec::EncodeError| CopyError::RowEncode {
        file: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut result = CopyResult::new();
    let mut rows = 0;
    while let Some(batch) = stream.next_batch().await? {
        if cancel.is_cancelled() {
            info!("Export of '{}' cancelled after {} row(s)", table, rows);
            result.cancelled = true;
            break;
        }

        let bytes = encoder.encode_batch(&batch).map_err(encode_err)?;
        file.write_all(&bytes)
            .await
            .map_err(|e| CopyError::io(path, e))?;
        rows += batch.len();
        debug!("Wrote batch of {} row(s) to {}", batch.len(), path.display());
    }

    let tail = encoder.finish().map_err(encode_err)?;
    file.write_all(&tail)
        .await
        .map_err(|e| CopyError::io(path, e))?;
    file.flush().await.map_err(|e| CopyError::io(path, e))?;

    info!("Exported {} row(s) to {}", rows, path.display());
    result.record_success(path.to_path_buf(), rows);
    Ok(result)
}
