//! Path resolution against a real filesystem

use std::path::PathBuf;

use table_copy::resolve::{resolve, resolve_export, resolve_import};
use table_copy::{CopyDirection, ResolveError, ResolvedTarget};
use tempfile::tempdir;

fn touch(dir: &std::path::Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "").unwrap();
    path
}

#[tokio::test]
async fn test_pattern_selects_matching_file() {
    let dir = tempdir().unwrap();
    let demo = touch(dir.path(), "demo.json");
    touch(dir.path(), "other.csv");

    let files = resolve_import(dir.path().to_str().unwrap(), Some("demo.*"))
        .await
        .unwrap();

    assert_eq!(files, vec![demo]);
}

#[tokio::test]
async fn test_directory_lists_regular_files_sorted() {
    let dir = tempdir().unwrap();
    let b = touch(dir.path(), "b.json");
    let a = touch(dir.path(), "a.json");
    let c = touch(dir.path(), "c.csv");
    touch(dir.path(), ".hidden.json");
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    touch(&dir.path().join("sub"), "d.json");

    let files = resolve_import(dir.path().to_str().unwrap(), None)
        .await
        .unwrap();

    assert_eq!(files, vec![a, b, c]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_directory_skips_symlinks() {
    let dir = tempdir().unwrap();
    let real = touch(dir.path(), "real.json");
    std::os::unix::fs::symlink(&real, dir.path().join("link.json")).unwrap();

    let files = resolve_import(dir.path().to_str().unwrap(), None)
        .await
        .unwrap();
    assert_eq!(files, vec![real.clone()]);

    let files = resolve_import(dir.path().to_str().unwrap(), Some("*.json"))
        .await
        .unwrap();
    assert_eq!(files, vec![real]);
}

#[tokio::test]
async fn test_single_file_target() {
    let dir = tempdir().unwrap();
    let file = touch(dir.path(), "demo.json");

    let files = resolve_import(file.to_str().unwrap(), None).await.unwrap();
    assert_eq!(files, vec![file.clone()]);

    let files = resolve_import(file.to_str().unwrap(), Some("*.csv"))
        .await
        .unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_missing_import_target() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent");

    let err = resolve_import(missing.to_str().unwrap(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::PathNotFound(p) if p == missing));
}

#[tokio::test]
async fn test_export_creates_parent_directory() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("a").join("b").join("out.json");

    let resolved = resolve(target.to_str().unwrap(), None, CopyDirection::Export)
        .await
        .unwrap();

    assert_eq!(resolved, ResolvedTarget::Export(target.clone()));
    assert!(dir.path().join("a").join("b").is_dir());
    assert!(!target.exists());
}

#[tokio::test]
async fn test_export_rejects_trailing_separator() {
    let dir = tempdir().unwrap();
    let target = format!("{}/out/", dir.path().display());

    let err = resolve_export(&target, None).await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidOption(_)));
}

#[tokio::test]
async fn test_resolve_dispatches_on_direction() {
    let dir = tempdir().unwrap();
    let b = touch(dir.path(), "b.json");
    let a = touch(dir.path(), "a.json");
    touch(dir.path(), "c.csv");

    let resolved = resolve(dir.path().to_str().unwrap(), Some("*.json"), CopyDirection::Import)
        .await
        .unwrap();
    assert_eq!(resolved, ResolvedTarget::Import(vec![a.clone(), b.clone()]));
    assert_eq!(resolved.paths(), &[a.clone(), b][..]);

    let resolved = resolve(a.to_str().unwrap(), None, CopyDirection::Export)
        .await
        .unwrap();
    assert_eq!(resolved.paths(), &[a][..]);

    let err = resolve(dir.path().to_str().unwrap(), Some("*.json"), CopyDirection::Export)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidOption(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_export_under_regular_file_is_io_error() {
    let dir = tempdir().unwrap();
    let file = touch(dir.path(), "plain.json");
    let target = file.join("out.json");

    let err = resolve_export(target.to_str().unwrap(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Io { ref path, .. } if *path == target));
}
