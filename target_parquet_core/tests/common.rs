#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, time::Duration};

use serde_json::{Value, json};
use target_parquet_core::{PipelineFailure, PipelineOptions, PipelineOutput, run_pipeline};
use target_parquet_schema::FlatRecord;
use target_parquet_writer::{FileWriter, InMemoryFileWriter, WriterError};

pub fn schema_line(stream: &str, properties: Value) -> String {
    json!({
        "type": "SCHEMA",
        "stream": stream,
        "schema": { "type": "object", "properties": properties },
        "key_properties": []
    })
    .to_string()
}

pub fn record_line(stream: &str, record: Value) -> String {
    json!({ "type": "RECORD", "stream": stream, "record": record }).to_string()
}

pub fn state_line(value: Value) -> String {
    json!({ "type": "STATE", "value": value }).to_string()
}

pub fn input(lines: &[String]) -> Vec<u8> {
    let mut buffer = lines.join("\n");
    buffer.push('\n');
    buffer.into_bytes()
}

pub async fn run_lines(
    lines: &[String],
    writer: Arc<dyn FileWriter>,
    options: PipelineOptions,
) -> Result<PipelineOutput, PipelineFailure> {
    let data = input(lines);
    run_pipeline(data.as_slice(), writer, options).await
}

/// Runs the pipeline against an in-memory writer.
pub async fn run_in_memory(
    lines: &[String],
    options: PipelineOptions,
) -> (Result<PipelineOutput, PipelineFailure>, Arc<InMemoryFileWriter>) {
    let writer = Arc::new(InMemoryFileWriter::new());
    let result = run_lines(lines, writer.clone(), options).await;
    (result, writer)
}

pub fn values(records: &[FlatRecord], field: &str) -> Vec<Value> {
    records.iter().map(|r| r[field].clone()).collect()
}

/// Delays every write, so that flushes are still in flight when the
/// ingestor finishes.
pub struct SlowFileWriter {
    pub inner: InMemoryFileWriter,
    pub delay: Duration,
}

impl SlowFileWriter {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryFileWriter::new(),
            delay,
        }
    }
}

#[async_trait::async_trait]
impl FileWriter for SlowFileWriter {
    async fn write(&self, stream: &str, records: Vec<FlatRecord>) -> Result<PathBuf, WriterError> {
        tokio::time::sleep(self.delay).await;
        self.inner.write(stream, records).await
    }
}

/// Fails every write for one stream.
pub struct FailingFileWriter {
    pub inner: InMemoryFileWriter,
    pub failing_stream: String,
}

impl FailingFileWriter {
    pub fn new(failing_stream: &str) -> Self {
        Self {
            inner: InMemoryFileWriter::new(),
            failing_stream: failing_stream.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl FileWriter for FailingFileWriter {
    async fn write(&self, stream: &str, records: Vec<FlatRecord>) -> Result<PathBuf, WriterError> {
        if stream == self.failing_stream {
            return Err(WriterError::UnsupportedValue {
                field: "payload".to_string(),
                found: "object",
            });
        }
        self.inner.write(stream, records).await
    }
}
