//! Format codecs
//!
//! Encodes row batches to bytes and decodes bytes back to row batches in a named
//! format. Formats are an enumerated tag; each tag dispatches to its codec:
//! - JSON (newline-delimited objects)
//! - CSV (header row + records)
//!
//! Decoding validates every row against the destination schema and is
//! all-or-nothing: the first invalid row fails the whole input.

pub mod csv;
pub mod json;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{RowBatch, TableSchema};

pub use self::csv::CsvEncoder;
pub use self::json::JsonEncoder;

/// Result type for encoding
pub type EncodeResult<T> = Result<T, EncodeError>;

/// A row that could not be decoded. Aborts decoding of the whole input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {row_index}{}: {reason}", column_suffix(.column))]
pub struct DecodeError {
    /// Zero-based index of the record within the input
    pub row_index: usize,
    /// Column the failure is attributed to, if any
    pub column: Option<String>,
    pub reason: String,
}

pub(crate) fn column_suffix(column: &Option<String>) -> String {
    column
        .as_ref()
        .map(|c| format!(", column '{}'", c))
        .unwrap_or_default()
}

impl DecodeError {
    pub fn row(row_index: usize, reason: impl Into<String>) -> Self {
        Self {
            row_index,
            column: None,
            reason: reason.into(),
        }
    }

    pub fn column(row_index: usize, column: &str, reason: impl Into<String>) -> Self {
        Self {
            row_index,
            column: Some(column.to_string()),
            reason: reason.into(),
        }
    }
}

/// Error during encoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("column '{column}' holds non-finite double {value}, which {format} cannot represent")]
    NonFiniteFloat {
        format: Format,
        column: String,
        value: String,
    },
    #[error("row has {found} values but schema has {expected} columns")]
    RowShape { expected: usize, found: usize },
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Requested format name has no registered codec
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported format: {0}")]
pub struct UnsupportedFormat(pub String);

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Csv,
}

impl Format {
    /// Every format with a registered codec
    pub const ALL: [Format; 2] = [Format::Json, Format::Csv];

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Csv => "csv",
        }
    }

    /// Create a streaming encoder for one output file
    pub fn encoder(&self, schema: &TableSchema) -> Encoder {
        match self {
            Format::Json => Encoder::Json(JsonEncoder::new(schema.clone())),
            Format::Csv => Encoder::Csv(CsvEncoder::new(schema.clone())),
        }
    }

    /// Encode a complete batch as the full contents of a file
    pub fn encode(&self, batch: &RowBatch, schema: &TableSchema) -> EncodeResult<Vec<u8>> {
        let mut encoder = self.encoder(schema);
        let mut bytes = encoder.encode_batch(batch)?;
        bytes.extend(encoder.finish()?);
        Ok(bytes)
    }

    /// Decode the full contents of a file into rows shaped by `schema`
    pub fn decode(&self, bytes: &[u8], schema: &TableSchema) -> Result<RowBatch, DecodeError> {
        match self {
            Format::Json => json::decode(bytes, schema),
            Format::Csv => csv::decode(bytes, schema),
        }
    }
}

impl FromStr for Format {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            _ => Err(UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Stateful per-file encoder. Batches are encoded in order; `finish` emits any
/// trailing bytes the format needs.
#[derive(Debug)]
pub enum Encoder {
    Json(JsonEncoder),
    Csv(CsvEncoder),
}

impl Encoder {
    pub fn encode_batch(&mut self, batch: &RowBatch) -> EncodeResult<Vec<u8>> {
        match self {
            Encoder::Json(encoder) => encoder.encode_batch(batch),
            Encoder::Csv(encoder) => encoder.encode_batch(batch),
        }
    }

    pub fn finish(self) -> EncodeResult<Vec<u8>> {
        match self {
            Encoder::Json(_) => Ok(Vec::new()),
            Encoder::Csv(encoder) => encoder.finish(),
        }
    }
}

fn check_row_shape(schema: &TableSchema, found: usize) -> EncodeResult<()> {
    if found != schema.len() {
        return Err(EncodeError::RowShape {
            expected: schema.len(),
            found,
        });
    }
    Ok(())
}
