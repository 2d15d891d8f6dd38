//! Path resolution for copy targets
//!
//! Turns a target string and optional filename pattern into concrete paths:
//! a single destination file for export, an ordered list of source files for
//! import. Import targets are classified as [`ImportSource`] and selected from
//! directory listings by pure functions; only listing and metadata touch the
//! filesystem.

use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use crate::copy::CopyDirection;

/// Error during path resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("Invalid option: {0}")]
    InvalidOption(String),
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for path resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Concrete paths a copy reads from or writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// Destination file, created if absent and overwritten if present
    Export(PathBuf),
    /// Source files in processing order; may be empty
    Import(Vec<PathBuf>),
}

impl ResolvedTarget {
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            ResolvedTarget::Export(path) => std::slice::from_ref(path),
            ResolvedTarget::Import(paths) => paths,
        }
    }
}

/// Shape of an import target
#[derive(Debug, Clone)]
pub enum ImportSource {
    SingleFile(PathBuf),
    Directory(PathBuf),
    DirectoryWithPattern { dir: PathBuf, pattern: Pattern },
}

/// What a directory entry is, without following symbolic links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// A directory entry as seen by the selection functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntryInfo {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

// `*` and `?` must not match a leading dot, so hidden files only match a
// pattern that names the dot explicitly.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Compile a filename pattern. Supports `*`, `?` and `[...]` classes.
pub fn compile_pattern(pattern: &str) -> ResolveResult<Pattern> {
    if pattern.contains('/') {
        return Err(ResolveError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern matches file names and cannot contain '/'".to_string(),
        });
    }
    Pattern::new(pattern).map_err(|e| ResolveError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

pub fn matches_pattern(pattern: &Pattern, name: &str) -> bool {
    pattern.matches_with(name, MATCH_OPTIONS)
}

/// Classify an import target from its metadata.
///
/// `is_dir` is `None` when the target does not exist. A pattern given with a
/// single-file target filters that file by name; `Ok(None)` means it did not
/// match and there is nothing to import.
pub fn classify_import(
    target: &Path,
    is_dir: Option<bool>,
    pattern: Option<&str>,
) -> ResolveResult<Option<ImportSource>> {
    let is_dir = is_dir.ok_or_else(|| ResolveError::PathNotFound(target.to_path_buf()))?;
    let pattern = pattern.map(compile_pattern).transpose()?;

    Ok(match (is_dir, pattern) {
        (false, None) => Some(ImportSource::SingleFile(target.to_path_buf())),
        (false, Some(pattern)) => target
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| matches_pattern(&pattern, name))
            .map(|_| ImportSource::SingleFile(target.to_path_buf())),
        (true, None) => Some(ImportSource::Directory(target.to_path_buf())),
        (true, Some(pattern)) => Some(ImportSource::DirectoryWithPattern {
            dir: target.to_path_buf(),
            pattern,
        }),
    })
}

/// Select the file names to import from a directory listing, sorted by name.
///
/// Only regular files qualify. Without a pattern hidden files are skipped; with
/// a pattern only names it matches are kept.
pub fn select_entries(entries: &[DirEntryInfo], pattern: Option<&Pattern>) -> Vec<String> {
    let mut names: Vec<String> = entries
        .iter()
        .filter(|entry| entry.kind == EntryKind::File)
        .filter(|entry| match pattern {
            Some(pattern) => matches_pattern(pattern, &entry.name),
            None => !entry.is_hidden(),
        })
        .map(|entry| entry.name.clone())
        .collect();
    names.sort();
    names
}

/// Resolve a copy target for the given direction
pub async fn resolve(
    target: &str,
    pattern: Option<&str>,
    direction: CopyDirection,
) -> ResolveResult<ResolvedTarget> {
    match direction {
        CopyDirection::Export => resolve_export(target, pattern)
            .await
            .map(ResolvedTarget::Export),
        CopyDirection::Import => resolve_import(target, pattern)
            .await
            .map(ResolvedTarget::Import),
    }
}

/// Resolve the destination file of an export, creating its parent directory.
pub async fn resolve_export(target: &str, pattern: Option<&str>) -> ResolveResult<PathBuf> {
    if pattern.is_some() {
        return Err(ResolveError::InvalidOption(
            "'pattern' is only valid when copying from files".to_string(),
        ));
    }
    if target.trim().is_empty() {
        return Err(ResolveError::InvalidOption(
            "copy target must not be empty".to_string(),
        ));
    }
    if target.ends_with('/') || target.ends_with(std::path::MAIN_SEPARATOR) {
        return Err(ResolveError::InvalidOption(format!(
            "export target '{}' must name a file, not a directory",
            target
        )));
    }

    let path = PathBuf::from(target);
    let is_dir = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata.is_dir(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(source) => return Err(ResolveError::Io { path, source }),
    };
    if is_dir {
        return Err(ResolveError::InvalidOption(format!(
            "export target '{}' is an existing directory",
            target
        )));
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ResolveError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    debug!("Resolved export target {}", path.display());
    Ok(path)
}

/// Resolve the ordered source files of an import.
pub async fn resolve_import(target: &str, pattern: Option<&str>) -> ResolveResult<Vec<PathBuf>> {
    let path = PathBuf::from(target);
    let is_dir = match tokio::fs::metadata(&path).await {
        Ok(metadata) => Some(metadata.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(source) => return Err(ResolveError::Io { path, source }),
    };

    let files = match classify_import(&path, is_dir, pattern)? {
        None => {
            debug!("File {} does not match the import pattern", path.display());
            Vec::new()
        }
        Some(ImportSource::SingleFile(file)) => vec![file],
        Some(ImportSource::Directory(dir)) => {
            let entries = list_dir(&dir).await?;
            join_names(&dir, select_entries(&entries, None))
        }
        Some(ImportSource::DirectoryWithPattern { dir, pattern }) => {
            let entries = list_dir(&dir).await?;
            join_names(&dir, select_entries(&entries, Some(&pattern)))
        }
    };

    debug!("Resolved {} import file(s) from {}", files.len(), target);
    Ok(files)
}

fn join_names(dir: &Path, names: Vec<String>) -> Vec<PathBuf> {
    names.into_iter().map(|name| dir.join(name)).collect()
}

/// List a directory without following symbolic links
pub async fn list_dir(dir: &Path) -> ResolveResult<Vec<DirEntryInfo>> {
    let io_err = |source| ResolveError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut read_dir = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(io_err)? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!("Skipping non UTF-8 file name in {}", dir.display());
            continue;
        };
        let file_type = entry.file_type().await.map_err(io_err)?;
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        entries.push(DirEntryInfo::new(name, kind));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<DirEntryInfo> {
        vec![
            DirEntryInfo::new("other.csv", EntryKind::File),
            DirEntryInfo::new("demo.json", EntryKind::File),
            DirEntryInfo::new("nested", EntryKind::Directory),
            DirEntryInfo::new(".hidden.json", EntryKind::File),
            DirEntryInfo::new("link.json", EntryKind::Symlink),
            DirEntryInfo::new("a.json", EntryKind::File),
        ]
    }

    #[test]
    fn test_select_with_pattern() {
        let pattern = compile_pattern("demo.*").unwrap();
        assert_eq!(select_entries(&entries(), Some(&pattern)), vec!["demo.json"]);
    }

    #[test]
    fn test_select_without_pattern() {
        assert_eq!(
            select_entries(&entries(), None),
            vec!["a.json", "demo.json", "other.csv"]
        );
    }

    #[test]
    fn test_select_question_mark() {
        let pattern = compile_pattern("?.json").unwrap();
        assert_eq!(select_entries(&entries(), Some(&pattern)), vec!["a.json"]);
    }

    #[test]
    fn test_star_does_not_match_hidden_files() {
        let pattern = compile_pattern("*.json").unwrap();
        assert_eq!(
            select_entries(&entries(), Some(&pattern)),
            vec!["a.json", "demo.json"]
        );

        let pattern = compile_pattern(".*.json").unwrap();
        assert_eq!(
            select_entries(&entries(), Some(&pattern)),
            vec![".hidden.json"]
        );
    }

    #[test]
    fn test_select_no_match() {
        let pattern = compile_pattern("*.parquet").unwrap();
        assert!(select_entries(&entries(), Some(&pattern)).is_empty());
    }

    #[test]
    fn test_compile_pattern_rejects_separator() {
        assert!(matches!(
            compile_pattern("dir/*.json"),
            Err(ResolveError::InvalidPattern { .. })
        ));
        assert!(matches!(
            compile_pattern("[unclosed"),
            Err(ResolveError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_classify_import() {
        let target = Path::new("/data/in");
        assert!(matches!(
            classify_import(target, None, None),
            Err(ResolveError::PathNotFound(_))
        ));
        assert!(matches!(
            classify_import(target, Some(false), None),
            Ok(Some(ImportSource::SingleFile(_)))
        ));
        assert!(matches!(
            classify_import(target, Some(true), None),
            Ok(Some(ImportSource::Directory(_)))
        ));
        match classify_import(target, Some(true), Some("*.json")).unwrap() {
            Some(ImportSource::DirectoryWithPattern { dir, pattern }) => {
                assert_eq!(dir, target);
                assert_eq!(pattern.as_str(), "*.json");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_single_file_with_pattern() {
        let target = Path::new("/data/demo.json");
        assert!(matches!(
            classify_import(target, Some(false), Some("demo.*")),
            Ok(Some(ImportSource::SingleFile(_)))
        ));
        assert!(matches!(
            classify_import(target, Some(false), Some("*.csv")),
            Ok(None)
        ));
    }
}
