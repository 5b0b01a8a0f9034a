use std::path::PathBuf;

use snafu::Snafu;
use target_parquet_core::PipelineFailure;
use target_parquet_observability::ObservabilityError;
use target_parquet_writer::WriterError;

/// CLI error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CliError {
    #[snafu(display("failed to read config file {}", path.display()))]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to parse config file {}", path.display()))]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("invalid {name} option: {message}"))]
    InvalidOption { name: &'static str, message: String },
    #[snafu(display("failed to set up logging"))]
    Observability { source: ObservabilityError },
    #[snafu(display("failed to create the parquet writer"))]
    Writer { source: WriterError },
    #[snafu(transparent)]
    Pipeline { source: PipelineFailure },
    #[snafu(display("failed to encode state"))]
    EncodeState { source: serde_json::Error },
    #[snafu(display("failed to emit state"))]
    EmitState { source: std::io::Error },
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;
