use std::path::PathBuf;

use arrow_schema::{ArrowError, DataType};
use parquet::errors::ParquetError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WriterError {
    /// Rows disagree on the type of a field.
    #[snafu(display("incompatible types for field {field}: {existing} and {found}"))]
    IncompatibleTypes {
        field: String,
        existing: DataType,
        found: DataType,
    },
    /// A field holds a value that has no column representation.
    #[snafu(display("unsupported {found} value for field {field}"))]
    UnsupportedValue { field: String, found: &'static str },
    #[snafu(display("Arrow error"))]
    Arrow { source: ArrowError },
    #[snafu(display("Parquet error"))]
    Parquet { source: ParquetError },
    #[snafu(display("IO error on {}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("unsupported parquet version {version}"))]
    UnsupportedFormatVersion { version: String },
    #[snafu(display("refusing to write an empty batch for stream {stream}"))]
    EmptyBatch { stream: String },
    #[snafu(display("writer task failed"))]
    Task { source: tokio::task::JoinError },
}

pub type Result<T, E = WriterError> = std::result::Result<T, E>;

impl WriterError {
    /// Whether the batch itself could not be turned into columns.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            Self::IncompatibleTypes { .. } | Self::UnsupportedValue { .. } | Self::Arrow { .. }
        )
    }
}
