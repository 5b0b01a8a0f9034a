//! Conversion of flat records into an Arrow [`RecordBatch`].
//!
//! Columns are the union of the fields of every record, ordered by first
//! appearance. Column types are inferred from the values; a record that does
//! not have a field contributes a null.
use std::{collections::HashMap, sync::Arc};

use arrow::record_batch::RecordBatch;
use arrow_json::ReaderBuilder;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use serde_json::Value;
use snafu::{OptionExt, ResultExt};
use target_parquet_schema::FlatRecord;

use crate::error::{
    ArrowSnafu, EmptyBatchSnafu, IncompatibleTypesSnafu, Result, UnsupportedValueSnafu,
};

/// Builds a single record batch holding `records` in order.
pub fn build_record_batch(stream: &str, records: &[FlatRecord]) -> Result<RecordBatch> {
    let schema = infer_schema(records)?;

    let mut decoder = ReaderBuilder::new(schema)
        .with_batch_size(records.len().max(1))
        .build_decoder()
        .context(ArrowSnafu {})?;
    decoder.serialize(records).context(ArrowSnafu {})?;

    decoder
        .flush()
        .context(ArrowSnafu {})?
        .context(EmptyBatchSnafu { stream })
}

/// Infers one nullable column per field name.
pub fn infer_schema(records: &[FlatRecord]) -> Result<SchemaRef> {
    let mut columns: Vec<ColumnInference> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        for (name, value) in record {
            let position = *index.entry(name.as_str()).or_insert_with(|| {
                columns.push(ColumnInference::new(name));
                columns.len() - 1
            });
            columns[position].observe(value)?;
        }
    }

    let fields = columns
        .into_iter()
        .map(|column| Field::new(column.name, column.data_type, true))
        .collect::<Vec<_>>();

    Ok(Arc::new(Schema::new(fields)))
}

struct ColumnInference {
    name: String,
    data_type: DataType,
    has_negative: bool,
}

impl ColumnInference {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: DataType::Null,
            has_negative: false,
        }
    }

    fn observe(&mut self, value: &Value) -> Result<()> {
        let found = match value {
            Value::Null => return Ok(()),
            Value::Bool(_) => DataType::Boolean,
            Value::Number(number) if number.is_i64() => {
                self.has_negative |= number.as_i64().is_some_and(|n| n < 0);
                DataType::Int64
            }
            Value::Number(number) if number.is_u64() => DataType::UInt64,
            Value::Number(_) => DataType::Float64,
            Value::String(_) => DataType::Utf8,
            Value::Array(_) => {
                return UnsupportedValueSnafu {
                    field: self.name.as_str(),
                    found: "array",
                }
                .fail();
            }
            Value::Object(_) => {
                return UnsupportedValueSnafu {
                    field: self.name.as_str(),
                    found: "object",
                }
                .fail();
            }
        };

        let merged = match (&self.data_type, &found) {
            (DataType::Null, found) => found.clone(),
            (existing, found) if existing == found => found.clone(),
            (DataType::Int64, DataType::UInt64) | (DataType::UInt64, DataType::Int64)
                if !self.has_negative =>
            {
                DataType::UInt64
            }
            (DataType::Int64 | DataType::UInt64, DataType::Float64)
            | (DataType::Float64, DataType::Int64 | DataType::UInt64) => DataType::Float64,
            (existing, found) => {
                return IncompatibleTypesSnafu {
                    field: self.name.as_str(),
                    existing: existing.clone(),
                    found: found.clone(),
                }
                .fail();
            }
        };

        self.data_type = merged;
        Ok(())
    }
}
