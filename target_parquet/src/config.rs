use std::path::{Path, PathBuf};

use serde::Deserialize;
use snafu::ResultExt;
use target_parquet_core::{DEFAULT_QUEUE_CAPACITY, PipelineOptions};
use target_parquet_writer::{Compression, FormatVersion, WriteOptions};
use tracing::level_filters::LevelFilter;

use crate::error::{InvalidOptionSnafu, ParseConfigSnafu, ReadConfigSnafu, Result, WriterSnafu};

/// Target configuration, as read from the `--config` file.
///
/// Every key is optional and unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub destination_path: PathBuf,
    pub compression_method: Option<String>,
    pub parquet_version: String,
    pub streams_in_separate_folder: bool,
    pub file_size: Option<FileSize>,
    pub logging_level: Option<String>,
    pub disable_collection: bool,
    pub queue_capacity: usize,
}

/// Rotation threshold, accepted either as a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileSize {
    Rows(i64),
    Text(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination_path: PathBuf::from("."),
            compression_method: None,
            parquet_version: "1.0".to_string(),
            streams_in_separate_folder: false,
            file_size: None,
            logging_level: None,
            disable_collection: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context(ReadConfigSnafu { path })?;
        serde_json::from_str(&content).context(ParseConfigSnafu { path })
    }

    /// The level used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> Result<LevelFilter> {
        let Some(level) = self.logging_level.as_deref() else {
            return Ok(LevelFilter::INFO);
        };

        match level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LevelFilter::TRACE),
            "DEBUG" => Ok(LevelFilter::DEBUG),
            "INFO" => Ok(LevelFilter::INFO),
            "WARN" | "WARNING" => Ok(LevelFilter::WARN),
            "ERROR" | "CRITICAL" => Ok(LevelFilter::ERROR),
            _ => InvalidOptionSnafu {
                name: "logging_level",
                message: format!("unknown level {level}"),
            }
            .fail(),
        }
    }

    /// Must be called after logging is installed: an unknown compression
    /// method is reported as a warning.
    pub fn write_options(&self) -> Result<WriteOptions> {
        let format_version = FormatVersion::parse(&self.parquet_version).context(WriterSnafu {})?;

        Ok(WriteOptions {
            destination_path: self.destination_path.clone(),
            compression: Compression::from_config(self.compression_method.as_deref()),
            format_version,
            streams_in_separate_folder: self.streams_in_separate_folder,
        })
    }

    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        let options = PipelineOptions::default().with_queue_capacity(self.queue_capacity);

        match &self.file_size {
            None => Ok(options),
            Some(FileSize::Rows(rows)) => Ok(options.with_file_size(*rows)),
            Some(FileSize::Text(text)) => {
                let rows = text.trim().parse::<i64>().map_err(|err| {
                    InvalidOptionSnafu {
                        name: "file_size",
                        message: format!("{text:?} is not an integer: {err}"),
                    }
                    .build()
                })?;
                Ok(options.with_file_size(rows))
            }
        }
    }
}
