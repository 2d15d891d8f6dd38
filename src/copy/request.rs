//! Copy requests and `WITH` options

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::CopyError;
use crate::codec::Format;

/// `WITH` option key selecting the file format
pub const FORMAT_KEY: &str = "format";

/// `WITH` option key selecting a filename pattern for imports
pub const PATTERN_KEY: &str = "pattern";

/// Direction of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyDirection {
    /// `COPY <table> TO '<path>'`
    Export,
    /// `COPY <table> FROM '<path>'`
    Import,
}

impl std::fmt::Display for CopyDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyDirection::Export => write!(f, "export"),
            CopyDirection::Import => write!(f, "import"),
        }
    }
}

/// Options parsed from a `WITH (...)` clause
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    pub format: Format,
    pub pattern: Option<String>,
}

impl CopyOptions {
    /// Parse the raw key/value pairs of a `WITH` clause.
    ///
    /// Keys are case-insensitive. `format` defaults to JSON when absent.
    pub fn from_with(with: &HashMap<String, String>) -> Result<Self, CopyError> {
        let mut options = CopyOptions::default();
        for (key, value) in with {
            match key.to_lowercase().as_str() {
                FORMAT_KEY => options.format = value.parse()?,
                PATTERN_KEY => options.pattern = Some(value.clone()),
                _ => {
                    return Err(CopyError::InvalidOption(format!(
                        "unknown option '{}'",
                        key
                    )));
                }
            }
        }
        Ok(options)
    }
}

/// A single copy invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub direction: CopyDirection,
    pub table: String,
    /// File, directory, or destination path as written in the statement
    pub target: String,
    pub format: Format,
    pub pattern: Option<String>,
}

impl CopyRequest {
    /// `COPY <table> TO '<target>'`
    pub fn export(table: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(CopyDirection::Export, table, target)
    }

    /// `COPY <table> FROM '<target>'`
    pub fn import(table: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(CopyDirection::Import, table, target)
    }

    fn new(direction: CopyDirection, table: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            direction,
            table: table.into(),
            target: target.into(),
            format: Format::default(),
            pattern: None,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_options(mut self, options: CopyOptions) -> Self {
        self.format = options.format;
        self.pattern = options.pattern;
        self
    }

    /// Checks that need neither the catalog nor the filesystem
    pub fn validate(&self) -> Result<(), CopyError> {
        if self.table.trim().is_empty() {
            return Err(CopyError::InvalidOption(
                "table name must not be empty".to_string(),
            ));
        }
        if self.target.trim().is_empty() {
            return Err(CopyError::InvalidOption(
                "copy target must not be empty".to_string(),
            ));
        }
        if self.direction == CopyDirection::Export && self.pattern.is_some() {
            return Err(CopyError::InvalidOption(
                "'pattern' is only valid when copying from files".to_string(),
            ));
        }
        Ok(())
    }
}
