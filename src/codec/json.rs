//! JSON codec
//!
//! One JSON object per line, keyed by column name in schema order. Doubles are
//! written in shortest round-trip form and timestamps as integer epoch
//! milliseconds, so a decode of an encode reproduces every value exactly.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Map;

use super::{DecodeError, EncodeError, EncodeResult, Format, check_row_shape};
use crate::models::{ColumnSchema, ColumnType, Row, RowBatch, TableSchema, Timestamp, Value};

/// Line-delimited JSON encoder
#[derive(Debug)]
pub struct JsonEncoder {
    schema: TableSchema,
}

impl JsonEncoder {
    pub fn new(schema: TableSchema) -> Self {
        Self { schema }
    }

    pub fn encode_batch(&mut self, batch: &RowBatch) -> EncodeResult<Vec<u8>> {
        let mut out = Vec::new();
        for row in batch.iter() {
            check_row_shape(&self.schema, row.values.len())?;
            // serde_json writes NaN and infinities as null, which would not round-trip
            for (value, column) in row.values.iter().zip(&self.schema.columns) {
                if let Value::Float64(f) = value
                    && !f.is_finite()
                {
                    return Err(EncodeError::NonFiniteFloat {
                        format: Format::Json,
                        column: column.name.clone(),
                        value: f.to_string(),
                    });
                }
            }
            serde_json::to_writer(
                &mut out,
                &JsonRow {
                    schema: &self.schema,
                    row,
                },
            )
            .map_err(|e| EncodeError::SerializationError(e.to_string()))?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

struct JsonRow<'a> {
    schema: &'a TableSchema,
    row: &'a Row,
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.schema.len()))?;
        for (column, value) in self.schema.columns.iter().zip(&self.row.values) {
            map.serialize_entry(&column.name, &JsonCell(value))?;
        }
        map.end()
    }
}

struct JsonCell<'a>(&'a Value);

impl Serialize for JsonCell<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Int64(i) => serializer.serialize_i64(*i),
            Value::Float64(f) => serializer.serialize_f64(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Timestamp(ts) => serializer.serialize_i64(ts.millis()),
        }
    }
}

/// Decode line-delimited JSON. Blank lines are skipped, keys that are not
/// columns of `schema` are ignored.
pub fn decode(bytes: &[u8], schema: &TableSchema) -> Result<RowBatch, DecodeError> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::row(0, format!("input is not valid UTF-8: {}", e)))?;

    let mut rows = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let row_index = rows.len();

        let object: Map<String, serde_json::Value> = match serde_json::from_str(trimmed) {
            Ok(serde_json::Value::Object(object)) => object,
            Ok(other) => {
                return Err(DecodeError::row(
                    row_index,
                    format!("expected a JSON object, found {}", json_kind(&other)),
                ));
            }
            Err(e) => return Err(DecodeError::row(row_index, e.to_string())),
        };

        let values = schema
            .columns
            .iter()
            .map(|column| decode_cell(object.get(&column.name), column, row_index))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(Row::new(values));
    }

    Ok(RowBatch::new(rows))
}

fn decode_cell(
    cell: Option<&serde_json::Value>,
    column: &ColumnSchema,
    row_index: usize,
) -> Result<Value, DecodeError> {
    let cell = match cell {
        None | Some(serde_json::Value::Null) if column.is_required() => {
            return Err(DecodeError::column(
                row_index,
                &column.name,
                "missing required column",
            ));
        }
        None | Some(serde_json::Value::Null) => return Ok(Value::Null),
        Some(cell) => cell,
    };

    coerce(cell, column.data_type).map_err(|reason| {
        DecodeError::column(row_index, &column.name, reason)
    })
}

fn coerce(cell: &serde_json::Value, data_type: ColumnType) -> Result<Value, String> {
    use serde_json::Value as Json;

    match (data_type, cell) {
        (ColumnType::String, Json::String(s)) => Ok(Value::String(s.clone())),
        (ColumnType::Int64, Json::Number(n)) => n
            .as_i64()
            .map(Value::Int64)
            .ok_or_else(|| format!("{} is not a 64-bit integer", n)),
        (ColumnType::Float64, Json::Number(n)) => n
            .as_f64()
            .map(Value::Float64)
            .ok_or_else(|| format!("{} is not a double", n)),
        (ColumnType::Boolean, Json::Bool(b)) => Ok(Value::Boolean(*b)),
        (ColumnType::Timestamp, Json::Number(n)) => n
            .as_i64()
            .map(|millis| Value::Timestamp(Timestamp::from_millis(millis)))
            .ok_or_else(|| format!("{} is not an epoch millisecond timestamp", n)),
        (ColumnType::Timestamp, Json::String(s)) => Timestamp::parse(s)
            .map(Value::Timestamp)
            .ok_or_else(|| format!("'{}' is not a millisecond-precision timestamp", s)),
        (expected, other) => Err(format!(
            "expected {}, found {}",
            expected,
            json_kind(other)
        )),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
