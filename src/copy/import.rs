//! Files to table
//!
//! Files are read and decoded by spawned tasks, at most `max_concurrent_files`
//! at a time. Each file holds a semaphore permit from spawn until its rows are
//! inserted, so a new decode starts as soon as an earlier file is stored.
//! Inserts run one file at a time in resolved order so the committed row count
//! is always exact.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CancellationFlag, CopyError, CopyResult};
use crate::codec::Format;
use crate::config::{CopyConfig, FailurePolicy};
use crate::models::{RowBatch, TableSchema};
use crate::storage::TableStorage;

type DecodeTask = JoinHandle<Result<RowBatch, CopyError>>;

/// A file being decoded, holding its slot in the decode window
struct InFlight {
    path: PathBuf,
    task: DecodeTask,
    _permit: OwnedSemaphorePermit,
}

pub(super) async fn import_files<S: TableStorage + ?Sized>(
    storage: &S,
    table: &str,
    schema: Arc<TableSchema>,
    files: Vec<PathBuf>,
    format: Format,
    config: &CopyConfig,
    cancel: &CancellationFlag,
) -> Result<CopyResult, CopyError> {
    let mut result = CopyResult::new();
    if files.is_empty() {
        info!("No files to import into '{}'", table);
        return Ok(result);
    }

    let permits = Arc::new(Semaphore::new(config.max_concurrent_files.max(1)));
    let mut pending = files.into_iter();
    let mut in_flight: VecDeque<InFlight> = VecDeque::new();

    loop {
        if cancel.is_cancelled() {
            info!(
                "Import into '{}' cancelled after {} row(s)",
                table, result.affected_rows
            );
            abort_all(&in_flight);
            result.cancelled = true;
            return Ok(result);
        }

        while let Ok(permit) = permits.clone().try_acquire_owned() {
            let Some(path) = pending.next() else { break };
            let task = tokio::spawn(read_and_decode(path.clone(), schema.clone(), format));
            in_flight.push_back(InFlight {
                path,
                task,
                _permit: permit,
            });
        }

        let Some(InFlight {
            path,
            task,
            _permit,
        }) = in_flight.pop_front()
        else {
            break;
        };

        let decoded = match task.await {
            Ok(decoded) => decoded,
            Err(e) => Err(CopyError::Internal(format!(
                "decode task for {} failed: {}",
                path.display(),
                e
            ))),
        };

        let batch = match decoded {
            Ok(batch) => batch,
            Err(err @ CopyError::RowDecode { .. })
                if config.on_error == FailurePolicy::Continue =>
            {
                warn!("Skipping {}: {}", path.display(), err);
                result.record_failure(path, err);
                continue;
            }
            Err(err) => {
                warn!("Import into '{}' failed on {}: {}", table, path.display(), err);
                abort_all(&in_flight);
                let committed = result.affected_rows;
                return Err(aborted(result, path, committed, err));
            }
        };

        if cancel.is_cancelled() {
            info!(
                "Import into '{}' cancelled after {} row(s)",
                table, result.affected_rows
            );
            abort_all(&in_flight);
            result.cancelled = true;
            return Ok(result);
        }

        match insert_file(storage, table, batch, config.batch_size).await {
            Ok(rows) => {
                debug!("Imported {} row(s) from {}", rows, path.display());
                result.record_success(path, rows);
            }
            Err((stored, err)) => {
                warn!("Import into '{}' failed on {}: {}", table, path.display(), err);
                abort_all(&in_flight);
                let committed = result.affected_rows + stored;
                return Err(aborted(result, path, committed, err));
            }
        }
    }

    info!(
        "Imported {} row(s) from {} file(s) into '{}'",
        result.affected_rows,
        result.succeeded().count(),
        table
    );
    Ok(result)
}

async fn read_and_decode(
    path: PathBuf,
    schema: Arc<TableSchema>,
    format: Format,
) -> Result<RowBatch, CopyError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| CopyError::io(&path, e))?;
    let batch = format
        .decode(&bytes, &schema)
        .map_err(|e| CopyError::decode(&path, e))?;
    debug!("Decoded {} row(s) from {}", batch.len(), path.display());
    Ok(batch)
}

/// Insert one decoded file in `batch_size` chunks. On failure, returns the rows
/// already stored from this file with the error.
async fn insert_file<S: TableStorage + ?Sized>(
    storage: &S,
    table: &str,
    batch: RowBatch,
    batch_size: usize,
) -> Result<usize, (usize, CopyError)> {
    let mut stored = 0;
    for chunk in batch.into_chunks(batch_size) {
        match storage.insert_rows(table, chunk).await {
            Ok(rows) => stored += rows,
            Err(e) => return Err((stored, e.into())),
        }
    }
    Ok(stored)
}

fn abort_all(in_flight: &VecDeque<InFlight>) {
    for file in in_flight {
        file.task.abort();
    }
}

/// Errors after any file finished carry the committed count and the outcomes
/// so far; a failure on the very first file is returned as is.
fn aborted(
    partial: CopyResult,
    file: PathBuf,
    committed_rows: usize,
    err: CopyError,
) -> CopyError {
    if committed_rows == 0 && partial.files.is_empty() {
        return err;
    }
    CopyError::ImportAborted {
        committed_rows,
        file,
        partial: Box::new(partial),
        source: Box::new(err),
    }
}
