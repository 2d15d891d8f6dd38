//! Error reporting, failure policies and cancellation

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use table_copy::{
    CancellationFlag, ColumnSchema, ColumnType, CopyConfig, CopyError, CopyRequest,
    FailurePolicy, Format, MemoryDatabase, RowBatch, RowBatchStream, StorageError, TableCopier,
    TableSchema, TableStorage,
};
use table_copy::storage::StorageResult;
use tempfile::tempdir;

fn metrics_schema(name: &str) -> TableSchema {
    TableSchema::new(
        name,
        vec![
            ColumnSchema::new("host", ColumnType::String),
            ColumnSchema::new("cpu", ColumnType::Float64),
            ColumnSchema::time_index("ts"),
        ],
    )
}

async fn metrics_database() -> Arc<MemoryDatabase> {
    let db = Arc::new(MemoryDatabase::new());
    db.create_table(metrics_schema("metrics")).await.unwrap();
    db
}

fn write_good(dir: &Path, name: &str, rows: usize) {
    let content: String = (0..rows)
        .map(|i| format!("{{\"host\":\"{}\",\"cpu\":{}.25,\"ts\":{}}}\n", name, i, i))
        .collect();
    std::fs::write(dir.join(name), content).unwrap();
}

fn write_missing_ts(dir: &Path, name: &str) {
    std::fs::write(
        dir.join(name),
        "{\"host\":\"ok\",\"cpu\":1.0,\"ts\":1}\n{\"host\":\"bad\",\"cpu\":2.0}\n",
    )
    .unwrap();
}

/// Delegates to a [`MemoryDatabase`], failing once `fail_after` inserts succeeded
struct FlakyStorage {
    inner: Arc<MemoryDatabase>,
    fail_after: usize,
    inserts: AtomicUsize,
}

#[async_trait]
impl TableStorage for FlakyStorage {
    async fn stream_rows(
        &self,
        table: &str,
        batch_size: usize,
    ) -> StorageResult<Box<dyn RowBatchStream>> {
        self.inner.stream_rows(table, batch_size).await
    }

    async fn insert_rows(&self, table: &str, batch: RowBatch) -> StorageResult<usize> {
        if self.inserts.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(StorageError::WriteFailed("region unavailable".to_string()));
        }
        self.inner.insert_rows(table, batch).await
    }
}

/// Cancels the copy from inside the first insert
struct CancellingStorage {
    inner: Arc<MemoryDatabase>,
    cancel: CancellationFlag,
}

#[async_trait]
impl TableStorage for CancellingStorage {
    async fn stream_rows(
        &self,
        table: &str,
        batch_size: usize,
    ) -> StorageResult<Box<dyn RowBatchStream>> {
        self.inner.stream_rows(table, batch_size).await
    }

    async fn insert_rows(&self, table: &str, batch: RowBatch) -> StorageResult<usize> {
        self.cancel.cancel();
        self.inner.insert_rows(table, batch).await
    }
}

#[tokio::test]
async fn test_missing_time_index_fails_whole_file() {
    let db = metrics_database().await;
    let copier = TableCopier::from_database(db.clone());
    let dir = tempdir().unwrap();
    write_missing_ts(dir.path(), "bad.json");

    let err = copier
        .copy(CopyRequest::import(
            "metrics",
            dir.path().join("bad.json").to_str().unwrap(),
        ))
        .await
        .unwrap_err();

    match err {
        CopyError::RowDecode {
            file,
            row_index,
            column,
            ..
        } => {
            assert_eq!(file, dir.path().join("bad.json"));
            assert_eq!(row_index, 1);
            assert_eq!(column.as_deref(), Some("ts"));
        }
        other => panic!("expected RowDecode, got {:?}", other),
    }
    assert_eq!(db.row_count("metrics").await.unwrap(), 0);
}

#[tokio::test]
async fn test_strict_import_reports_committed_rows() {
    let db = metrics_database().await;
    let copier = TableCopier::from_database(db.clone());
    let dir = tempdir().unwrap();
    write_good(dir.path(), "a.json", 3);
    write_missing_ts(dir.path(), "b.json");
    write_good(dir.path(), "c.json", 2);

    let err = copier
        .copy(CopyRequest::import("metrics", dir.path().to_str().unwrap()))
        .await
        .unwrap_err();

    assert_eq!(err.committed_rows(), 3);
    assert!(matches!(err.root_cause(), CopyError::RowDecode { .. }));
    assert_eq!(db.row_count("metrics").await.unwrap(), 3);

    assert_eq!(err.failed_file(), Some(dir.path().join("b.json").as_path()));
    let partial = err.partial_result().expect("aborted import keeps its outcomes");
    let committed: Vec<&Path> = partial.succeeded().map(|f| f.path.as_path()).collect();
    assert_eq!(committed, vec![dir.path().join("a.json").as_path()]);
    assert_eq!(partial.affected_rows, 3);
    assert!(partial.files.iter().all(|f| !f.path.ends_with("c.json")));
}

#[tokio::test]
async fn test_continue_policy_reports_partial_success() {
    let db = metrics_database().await;
    let copier = TableCopier::from_database(db.clone()).with_config(
        CopyConfig::new()
            .with_failure_policy(FailurePolicy::Continue)
            .with_max_concurrent_files(2),
    );
    let dir = tempdir().unwrap();
    write_good(dir.path(), "a.json", 3);
    write_missing_ts(dir.path(), "b.json");
    write_good(dir.path(), "c.json", 2);

    let result = copier
        .copy(CopyRequest::import("metrics", dir.path().to_str().unwrap()))
        .await
        .unwrap();

    assert!(result.is_partial());
    assert_eq!(result.affected_rows, 5);
    assert_eq!(db.row_count("metrics").await.unwrap(), 5);

    let failed: Vec<&Path> = result.failures().map(|f| f.path.as_path()).collect();
    assert_eq!(failed, vec![dir.path().join("b.json").as_path()]);
    assert_eq!(result.succeeded().count(), 2);
    assert!(
        result
            .to_string()
            .starts_with("Affected Rows: 5\nFailed ")
    );
}

#[tokio::test]
async fn test_storage_write_failure_aborts_with_exact_count() {
    let db = metrics_database().await;
    let storage = FlakyStorage {
        inner: db.clone(),
        fail_after: 2,
        inserts: AtomicUsize::new(0),
    };
    let copier = TableCopier::new(db.clone(), storage)
        .with_config(
            CopyConfig::new()
                .with_batch_size(2)
                .with_failure_policy(FailurePolicy::Continue),
        );
    let dir = tempdir().unwrap();
    write_good(dir.path(), "a.json", 3);
    write_good(dir.path(), "b.json", 3);

    let err = copier
        .copy(CopyRequest::import("metrics", dir.path().to_str().unwrap()))
        .await
        .unwrap_err();

    // a.json: 2 + 1 rows, b.json: first insert fails
    assert_eq!(err.committed_rows(), 3);
    assert!(matches!(err.root_cause(), CopyError::StorageWrite(_)));
    assert_eq!(db.row_count("metrics").await.unwrap(), 3);
}

#[tokio::test]
async fn test_storage_failure_before_any_commit() {
    let db = metrics_database().await;
    let storage = FlakyStorage {
        inner: db.clone(),
        fail_after: 0,
        inserts: AtomicUsize::new(0),
    };
    let copier = TableCopier::new(db.clone(), storage);
    let dir = tempdir().unwrap();
    write_good(dir.path(), "a.json", 1);

    let err = copier
        .copy(CopyRequest::import("metrics", dir.path().to_str().unwrap()))
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::StorageWrite(_)));
    assert_eq!(err.committed_rows(), 0);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let db = metrics_database().await;
    let copier = TableCopier::from_database(db.clone());
    let dir = tempdir().unwrap();
    write_good(dir.path(), "a.json", 2);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let result = copier
        .copy_with_cancel(
            CopyRequest::import("metrics", dir.path().to_str().unwrap()),
            &cancel,
        )
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.affected_rows, 0);
    assert_eq!(db.row_count("metrics").await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_keeps_committed_files() {
    let db = metrics_database().await;
    let cancel = CancellationFlag::new();
    let storage = CancellingStorage {
        inner: db.clone(),
        cancel: cancel.clone(),
    };
    let copier = TableCopier::new(db.clone(), storage)
        .with_config(CopyConfig::new().with_batch_size(1));
    let dir = tempdir().unwrap();
    write_good(dir.path(), "a.json", 2);
    write_good(dir.path(), "b.json", 2);

    let result = copier
        .copy_with_cancel(
            CopyRequest::import("metrics", dir.path().to_str().unwrap()),
            &cancel,
        )
        .await
        .unwrap();

    // the file in progress finishes; the next file is never inserted
    assert!(result.cancelled);
    assert!(result.is_partial());
    assert_eq!(result.affected_rows, 2);
    assert_eq!(db.row_count("metrics").await.unwrap(), 2);
}

#[tokio::test]
async fn test_export_rejects_pattern() {
    let db = metrics_database().await;
    let copier = TableCopier::from_database(db);
    let dir = tempdir().unwrap();

    let err = copier
        .copy(
            CopyRequest::export("metrics", dir.path().join("m.json").to_str().unwrap())
                .with_pattern("*.json"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::InvalidOption(_)));
    assert!(!dir.path().join("m.json").exists());
}

#[tokio::test]
async fn test_export_to_directory_is_rejected() {
    let db = metrics_database().await;
    let copier = TableCopier::from_database(db);
    let dir = tempdir().unwrap();

    let err = copier
        .copy(CopyRequest::export("metrics", dir.path().to_str().unwrap()))
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::InvalidOption(_)));
}

#[test]
fn test_unsupported_format() {
    let err = "parquet".parse::<Format>().map_err(CopyError::from).unwrap_err();
    assert!(matches!(err, CopyError::UnsupportedFormat(ref f) if f == "parquet"));
}

#[tokio::test]
async fn test_missing_table() {
    let db = metrics_database().await;
    let copier = TableCopier::from_database(db);
    let dir = tempdir().unwrap();

    let err = copier
        .copy(CopyRequest::export(
            "nope",
            dir.path().join("nope.json").to_str().unwrap(),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::SchemaNotFound(ref t) if t == "nope"));
}

#[tokio::test]
async fn test_table_without_time_index() {
    let db = Arc::new(MemoryDatabase::new());
    db.create_table(TableSchema::new(
        "plain",
        vec![ColumnSchema::new("host", ColumnType::String)],
    ))
    .await
    .unwrap();
    let copier = TableCopier::from_database(db);
    let dir = tempdir().unwrap();

    let err = copier
        .copy(CopyRequest::export(
            "plain",
            dir.path().join("plain.json").to_str().unwrap(),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::SchemaMismatch(_)));
}

#[tokio::test]
async fn test_import_missing_path() {
    let db = metrics_database().await;
    let copier = TableCopier::from_database(db);
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    let err = copier
        .copy(CopyRequest::import("metrics", missing.to_str().unwrap()))
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::PathNotFound(ref p) if *p == missing));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let db = metrics_database().await;
    let copier =
        TableCopier::from_database(db).with_config(CopyConfig::new().with_batch_size(0));
    let dir = tempdir().unwrap();

    let err = copier
        .copy(CopyRequest::export(
            "metrics",
            dir.path().join("m.json").to_str().unwrap(),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::InvalidOption(_)));
}
