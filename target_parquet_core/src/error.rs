use std::path::PathBuf;

use snafu::Snafu;
use target_parquet_schema::SchemaError;
use target_parquet_writer::WriterError;

/// Errors raised while ingesting and batching messages.
///
/// Every variant except [`SinkError::UnknownMessageType`] is fatal.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// The line is not a well-formed message.
    #[snafu(display("unable to parse message: {line}"))]
    Parse {
        line: String,
        source: serde_json::Error,
    },
    #[snafu(display("message has no type: {line}"))]
    MissingMessageType { line: String },
    /// The message type is not one of RECORD, STATE or SCHEMA.
    #[snafu(display("unknown message type {message_type}"))]
    UnknownMessageType { message_type: String },
    /// A record arrived before any schema for its stream.
    #[snafu(display("a record for stream {stream} was encountered before a corresponding schema"))]
    UnknownStream { stream: String },
    #[snafu(transparent)]
    Schema { source: SchemaError },
    #[snafu(display("failed to write batch for stream {stream}"))]
    Write {
        stream: String,
        source: WriterError,
    },
    #[snafu(display("failed to read input"))]
    Input { source: std::io::Error },
    #[snafu(display("batcher stopped receiving events"))]
    BatcherClosed,
    #[snafu(display("batcher task failed"))]
    BatcherTask { source: tokio::task::JoinError },
}

pub type Result<T, E = SinkError> = std::result::Result<T, E>;

/// A fatal pipeline error, with the files that were completely written
/// before it happened.
#[derive(Debug, Snafu)]
#[snafu(display("pipeline failed after writing {} files", files.len()))]
pub struct PipelineFailure {
    pub source: SinkError,
    pub files: Vec<PathBuf>,
}

impl SinkError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnknownMessageType { .. })
    }
}
