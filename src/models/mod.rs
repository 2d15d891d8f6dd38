//! Models module
//!
//! Table schemas, typed values, rows and row batches shared by the codecs,
//! the storage interfaces and the copy orchestrator.

pub mod row;
pub mod schema;
pub mod value;

pub use row::{Row, RowBatch};
pub use schema::{ColumnRole, ColumnSchema, ColumnType, SchemaError, TableSchema};
pub use value::{Timestamp, Value};
