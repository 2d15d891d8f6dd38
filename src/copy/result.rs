//! Copy results

use std::fmt;
use std::path::PathBuf;

use super::CopyError;

/// Outcome of processing one file
#[derive(Debug)]
pub enum FileStatus {
    /// Every row of the file was written or stored
    Success { rows: usize },
    /// The file was rejected; none of its rows were stored
    Failure { error: CopyError },
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn success(path: PathBuf, rows: usize) -> Self {
        Self {
            path,
            status: FileStatus::Success { rows },
        }
    }

    pub fn failure(path: PathBuf, error: CopyError) -> Self {
        Self {
            path,
            status: FileStatus::Failure { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, FileStatus::Success { .. })
    }

    pub fn error(&self) -> Option<&CopyError> {
        match &self.status {
            FileStatus::Failure { error } => Some(error),
            FileStatus::Success { .. } => None,
        }
    }
}

/// Result of a copy operation.
///
/// `affected_rows` counts only rows written (export) or durably stored
/// (import); it is the value reported as `Affected Rows: N`.
#[derive(Debug, Default)]
#[must_use = "copy results carry per-file failures that should be checked"]
pub struct CopyResult {
    pub affected_rows: usize,
    /// Per-file outcomes in processing order
    pub files: Vec<FileOutcome>,
    /// The operation was cancelled before every file or batch was processed
    pub cancelled: bool,
}

impl CopyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_success(&mut self, path: PathBuf, rows: usize) {
        self.affected_rows += rows;
        self.files.push(FileOutcome::success(path, rows));
    }

    pub(crate) fn record_failure(&mut self, path: PathBuf, error: CopyError) {
        self.files.push(FileOutcome::failure(path, error));
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.is_success())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.is_success())
    }

    /// Some files failed, or the operation was cancelled part way
    pub fn is_partial(&self) -> bool {
        self.cancelled || self.failures().next().is_some()
    }
}

impl fmt::Display for CopyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Affected Rows: {}", self.affected_rows)?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        for outcome in self.failures() {
            if let Some(error) = outcome.error() {
                write!(f, "\nFailed {}: {}", outcome.path.display(), error)?;
            }
        }
        Ok(())
    }
}
