//! Copy orchestration
//!
//! [`TableCopier`] coordinates a `COPY` between a table and files:
//! - validates the request and the table schema
//! - resolves the target paths
//! - streams rows through the format codec
//! - accumulates the affected row count and per-file outcomes

mod cancel;
mod error;
mod export;
mod import;
mod request;
mod result;

use std::sync::Arc;

use tracing::info;

use crate::config::CopyConfig;
use crate::resolve::{self, ResolvedTarget};
use crate::storage::{TableCatalog, TableStorage};

pub use cancel::CancellationFlag;
pub use error::CopyError;
pub use request::{CopyDirection, CopyOptions, CopyRequest, FORMAT_KEY, PATTERN_KEY};
pub use result::{CopyResult, FileOutcome, FileStatus};

/// Runs copy requests against a catalog and a storage engine
#[derive(Debug, Clone)]
pub struct TableCopier<C, S> {
    catalog: C,
    storage: S,
    config: CopyConfig,
}

impl<D> TableCopier<Arc<D>, Arc<D>>
where
    D: TableCatalog + TableStorage + ?Sized,
{
    /// Copier over a database that serves both schemas and rows
    pub fn from_database(database: Arc<D>) -> Self {
        Self::new(database.clone(), database)
    }
}

impl<C: TableCatalog, S: TableStorage> TableCopier<C, S> {
    pub fn new(catalog: C, storage: S) -> Self {
        Self {
            catalog,
            storage,
            config: CopyConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CopyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    /// Run a copy to completion
    pub async fn copy(&self, request: CopyRequest) -> Result<CopyResult, CopyError> {
        self.copy_with_cancel(request, &CancellationFlag::new())
            .await
    }

    /// Run a copy, checking `cancel` between files and batches.
    ///
    /// A cancelled copy returns `Ok` with [`CopyResult::cancelled`] set; rows
    /// stored before cancellation stay stored.
    pub async fn copy_with_cancel(
        &self,
        request: CopyRequest,
        cancel: &CancellationFlag,
    ) -> Result<CopyResult, CopyError> {
        self.config
            .validate()
            .map_err(|e| CopyError::InvalidOption(e.to_string()))?;
        request.validate()?;

        let schema = self.catalog.get_table_schema(&request.table).await?;
        schema.time_index_position()?;

        info!(
            "Starting {} of table '{}' ({}) with target {}",
            request.direction, request.table, request.format, request.target
        );

        let resolved =
            resolve::resolve(&request.target, request.pattern.as_deref(), request.direction)
                .await?;
        let result = match resolved {
            ResolvedTarget::Export(path) => {
                export::export_table(
                    &self.storage,
                    &request.table,
                    &schema,
                    &path,
                    request.format,
                    self.config.batch_size,
                    cancel,
                )
                .await?
            }
            ResolvedTarget::Import(files) => {
                import::import_files(
                    &self.storage,
                    &request.table,
                    schema,
                    files,
                    request.format,
                    &self.config,
                    cancel,
                )
                .await?
            }
        };

        info!(
            "Finished {} of table '{}': {} row(s), {} failed file(s){}",
            request.direction,
            request.table,
            result.affected_rows,
            result.failures().count(),
            if result.cancelled { ", cancelled" } else { "" }
        );
        Ok(result)
    }
}
