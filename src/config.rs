//! Copy configuration file support
//!
//! Handles parsing of `table-copy.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "table-copy.toml";

/// Environment variable for the batch size
pub const ENV_BATCH_SIZE: &str = "TABLE_COPY_BATCH_SIZE";

/// Environment variable for the import file concurrency
pub const ENV_MAX_CONCURRENT_FILES: &str = "TABLE_COPY_MAX_CONCURRENT_FILES";

/// Environment variable for the import failure policy
pub const ENV_ON_ERROR: &str = "TABLE_COPY_ON_ERROR";

/// Error type for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// What an import does when a file fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failed file (strict ingestion)
    #[default]
    Abort,
    /// Record the failure and carry on with the remaining files
    Continue,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" | "strict" => Ok(FailurePolicy::Abort),
            "continue" | "partial" => Ok(FailurePolicy::Continue),
            _ => Err(format!(
                "Unknown failure policy: {}. Use 'abort' or 'continue'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

/// Copy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Rows per batch when streaming a table out or inserting decoded rows
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Files read and decoded concurrently during an import
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,

    /// Failure policy for multi-file imports
    #[serde(default)]
    pub on_error: FailurePolicy,
}

fn default_batch_size() -> usize {
    1024
}

fn default_max_concurrent_files() -> usize {
    4
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_files: default_max_concurrent_files(),
            on_error: FailurePolicy::default(),
        }
    }
}

impl CopyConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_concurrent_files(mut self, max_concurrent_files: usize) -> Self {
        self.max_concurrent_files = max_concurrent_files;
        self
    }

    pub fn with_failure_policy(mut self, on_error: FailurePolicy) -> Self {
        self.on_error = on_error;
        self
    }

    /// Load configuration from a directory
    ///
    /// Looks for `table-copy.toml` in the directory.
    /// Falls back to defaults if not found.
    pub fn load(dir: &Path) -> ConfigResult<Self> {
        let config_path = dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        // Apply environment variable overrides
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var(ENV_BATCH_SIZE)
            && let Ok(size) = size.parse()
        {
            self.batch_size = size;
        }

        if let Ok(limit) = std::env::var(ENV_MAX_CONCURRENT_FILES)
            && let Ok(limit) = limit.parse()
        {
            self.max_concurrent_files = limit;
        }

        if let Ok(policy) = std::env::var(ENV_ON_ERROR)
            && let Ok(policy) = policy.parse()
        {
            self.on_error = policy;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_files == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_files must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Table copy configuration

# Rows per batch when exporting a table or inserting imported rows
batch_size = 1024

# Files read and decoded concurrently during an import
max_concurrent_files = 4

# What to do when an imported file fails to decode: "abort" or "continue"
on_error = "abort"
"#
}
