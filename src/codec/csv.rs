//! CSV codec
//!
//! A header row of column names followed by one record per row. NULL is written
//! as `\N` so it stays distinct from the empty string; a string value made of
//! backslashes followed by `N` gets one extra leading backslash. Doubles use
//! shortest round-trip text and timestamps are integer epoch milliseconds.
//!
//! On decode an empty field is the empty string in a string column and NULL in
//! any other column.

use ::csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::{DecodeError, EncodeError, EncodeResult, check_row_shape};
use crate::models::{ColumnSchema, ColumnType, Row, RowBatch, TableSchema, Timestamp, Value};

/// CSV encoder. The header is written ahead of the first batch, or by `finish`
/// when no batch was encoded.
#[derive(Debug)]
pub struct CsvEncoder {
    schema: TableSchema,
    header_written: bool,
}

impl CsvEncoder {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            header_written: false,
        }
    }

    pub fn encode_batch(&mut self, batch: &RowBatch) -> EncodeResult<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        if !self.header_written {
            writer
                .write_record(self.schema.column_names())
                .map_err(|e| EncodeError::SerializationError(e.to_string()))?;
            self.header_written = true;
        }

        for row in batch.iter() {
            check_row_shape(&self.schema, row.values.len())?;
            let record: Vec<String> = row.values.iter().map(value_to_field).collect();
            writer
                .write_record(&record)
                .map_err(|e| EncodeError::SerializationError(e.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|e| EncodeError::SerializationError(e.to_string()))
    }

    pub fn finish(mut self) -> EncodeResult<Vec<u8>> {
        if self.header_written {
            return Ok(Vec::new());
        }
        self.encode_batch(&RowBatch::empty())
    }
}

/// Field text of a NULL value
pub const NULL_MARKER: &str = "\\N";

fn value_to_field(value: &Value) -> String {
    match value {
        Value::Null => NULL_MARKER.to_string(),
        Value::String(s) if looks_like_marker(s) => format!("\\{}", s),
        Value::String(s) => s.clone(),
        Value::Int64(i) => i.to_string(),
        Value::Float64(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Timestamp(ts) => ts.millis().to_string(),
    }
}

/// Decode CSV with a header row. Columns are matched by header name; header
/// columns unknown to `schema` are ignored.
pub fn decode(bytes: &[u8], schema: &TableSchema) -> Result<RowBatch, DecodeError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| DecodeError::row(0, format!("invalid CSV header: {}", e)))?
        .clone();
    let positions: Vec<Option<usize>> = schema
        .columns
        .iter()
        .map(|column| headers.iter().position(|h| h.trim() == column.name))
        .collect();

    let mut rows = Vec::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DecodeError::row(row_index, e.to_string()))?;
        let values = schema
            .columns
            .iter()
            .zip(&positions)
            .map(|(column, position)| decode_field(&record, *position, column, row_index))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(Row::new(values));
    }

    Ok(RowBatch::new(rows))
}

fn decode_field(
    record: &StringRecord,
    position: Option<usize>,
    column: &ColumnSchema,
    row_index: usize,
) -> Result<Value, DecodeError> {
    let field = match position.and_then(|p| record.get(p)) {
        Some(field) => field,
        None if column.is_required() => {
            return Err(DecodeError::column(
                row_index,
                &column.name,
                "missing required column",
            ));
        }
        None => return Ok(Value::Null),
    };

    let is_null = field == NULL_MARKER
        || (field.is_empty() && column.data_type != ColumnType::String);
    if is_null {
        if column.is_required() {
            return Err(DecodeError::column(
                row_index,
                &column.name,
                "missing required column",
            ));
        }
        return Ok(Value::Null);
    }

    if column.data_type == ColumnType::String && looks_like_marker(field) {
        return Ok(Value::String(field[1..].to_string()));
    }

    parse_field(field, column.data_type)
        .map_err(|reason| DecodeError::column(row_index, &column.name, reason))
}

/// One or more backslashes followed by a single `N`
fn looks_like_marker(s: &str) -> bool {
    s.len() >= 2
        && s.ends_with('N')
        && s[..s.len() - 1].bytes().all(|b| b == b'\\')
}

fn parse_field(field: &str, data_type: ColumnType) -> Result<Value, String> {
    match data_type {
        ColumnType::String => Ok(Value::String(field.to_string())),
        ColumnType::Int64 => field
            .trim()
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|_| format!("'{}' is not a 64-bit integer", field)),
        ColumnType::Float64 => field
            .trim()
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|_| format!("'{}' is not a double", field)),
        ColumnType::Boolean => match field.trim().to_lowercase().as_str() {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => Err(format!("'{}' is not a boolean", field)),
        },
        ColumnType::Timestamp => {
            let trimmed = field.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .map(Timestamp::from_millis)
                .or_else(|| Timestamp::parse(trimmed))
                .map(Value::Timestamp)
                .ok_or_else(|| format!("'{}' is not a millisecond-precision timestamp", field))
        }
    }
}
