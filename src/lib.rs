//! Table Copy - bulk transfer between database tables and files
//!
//! Implements the `COPY` statement of a tabular database:
//! - `COPY <table> TO '<file>'` streams a table into one file
//! - `COPY <table> FROM '<file-or-dir>'` reads one file, a directory, or the
//!   files of a directory matching a glob pattern, validating every row
//!   against the destination schema before inserting it
//!
//! The catalog and row storage are external collaborators behind the
//! [`TableCatalog`] and [`TableStorage`] traits. [`MemoryDatabase`] is an
//! in-memory engine implementing both.

pub mod codec;
pub mod config;
pub mod copy;
pub mod models;
pub mod resolve;
pub mod storage;
pub mod stream;

pub use codec::{DecodeError, EncodeError, Format, UnsupportedFormat};
pub use config::{CopyConfig, FailurePolicy};
pub use copy::{
    CancellationFlag, CopyDirection, CopyError, CopyOptions, CopyRequest, CopyResult, FileOutcome,
    FileStatus, TableCopier,
};
pub use models::{
    ColumnRole, ColumnSchema, ColumnType, Row, RowBatch, SchemaError, TableSchema, Timestamp,
    Value,
};
pub use resolve::{ImportSource, ResolveError, ResolvedTarget};
pub use storage::{MemoryDatabase, StorageError, TableCatalog, TableStorage};
pub use stream::{RowBatchStream, VecBatchStream};
