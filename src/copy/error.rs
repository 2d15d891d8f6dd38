//! Copy error types

use std::io;
use std::path::{Path, PathBuf};

use super::CopyResult;
use crate::codec::{DecodeError, UnsupportedFormat, column_suffix};
use crate::models::SchemaError;
use crate::resolve::ResolveError;
use crate::storage::StorageError;

/// Error during a copy operation
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// Table is unknown to the catalog
    #[error("Table not found: {0}")]
    SchemaNotFound(String),

    /// Table schema cannot take part in a copy
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Bad `WITH` option or target
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// No codec registered for the requested format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Import source does not exist
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// A file holds a row that does not fit the destination schema
    #[error("Failed to decode {}: row {row_index}{}: {reason}", .file.display(), column_suffix(.column))]
    RowDecode {
        file: PathBuf,
        row_index: usize,
        column: Option<String>,
        reason: String,
    },

    /// Rows could not be encoded in the requested format
    #[error("Failed to encode rows for {}: {reason}", .file.display())]
    RowEncode { file: PathBuf, reason: String },

    /// The storage engine rejected an insert
    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    /// The storage engine failed to stream rows
    #[error("Storage read failed: {0}")]
    StorageRead(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file processing task panicked or was dropped
    #[error("Internal error: {0}")]
    Internal(String),

    /// An import stopped part way on `file`. `committed_rows` were stored
    /// before the failure and stay stored, including any rows of `file` that
    /// made it in. `partial` holds the outcomes of the files finished before it.
    #[error("Import aborted on {} after committing {committed_rows} row(s): {source}", .file.display())]
    ImportAborted {
        committed_rows: usize,
        file: PathBuf,
        partial: Box<CopyResult>,
        #[source]
        source: Box<CopyError>,
    },
}

impl CopyError {
    pub(crate) fn decode(file: &Path, err: DecodeError) -> Self {
        CopyError::RowDecode {
            file: file.to_path_buf(),
            row_index: err.row_index,
            column: err.column,
            reason: err.reason,
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        CopyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The underlying error, looking through [`CopyError::ImportAborted`]
    pub fn root_cause(&self) -> &CopyError {
        match self {
            CopyError::ImportAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Rows durably stored before the error, when known
    pub fn committed_rows(&self) -> usize {
        match self {
            CopyError::ImportAborted { committed_rows, .. } => *committed_rows,
            _ => 0,
        }
    }

    /// Per-file outcomes of an aborted import, up to the failing file
    pub fn partial_result(&self) -> Option<&CopyResult> {
        match self {
            CopyError::ImportAborted { partial, .. } => Some(partial.as_ref()),
            _ => None,
        }
    }

    /// The file the error concerns; for an aborted import, the one it stopped on
    pub fn failed_file(&self) -> Option<&Path> {
        match self {
            CopyError::ImportAborted { file, .. } => Some(file.as_path()),
            CopyError::RowDecode { file, .. } | CopyError::RowEncode { file, .. } => {
                Some(file.as_path())
            }
            CopyError::Io { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}

impl From<ResolveError> for CopyError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::PathNotFound(path) => CopyError::PathNotFound(path),
            ResolveError::InvalidOption(msg) => CopyError::InvalidOption(msg),
            ResolveError::InvalidPattern { pattern, reason } => {
                CopyError::InvalidOption(format!("invalid pattern '{}': {}", pattern, reason))
            }
            ResolveError::Io { path, source } => CopyError::Io { path, source },
        }
    }
}

impl From<SchemaError> for CopyError {
    fn from(err: SchemaError) -> Self {
        CopyError::SchemaMismatch(err.to_string())
    }
}

impl From<UnsupportedFormat> for CopyError {
    fn from(err: UnsupportedFormat) -> Self {
        CopyError::UnsupportedFormat(err.0)
    }
}

impl From<StorageError> for CopyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TableNotFound(table) => CopyError::SchemaNotFound(table),
            StorageError::ReadFailed(msg) => CopyError::StorageRead(msg),
            other => CopyError::StorageWrite(other.to_string()),
        }
    }
}
