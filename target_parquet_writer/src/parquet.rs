use std::{fs::OpenOptions, path::PathBuf, sync::Arc};

use parquet::{
    arrow::ArrowWriter,
    basic::Compression as ParquetCompression,
    file::{metadata::KeyValue, properties::WriterProperties},
};
use snafu::{ResultExt, ensure};
use target_parquet_schema::FlatRecord;
use tracing::{debug, info};

use crate::{
    FileWriter,
    batch::build_record_batch,
    compression::Compression,
    error::{EmptyBatchSnafu, IoSnafu, ParquetSnafu, Result, TaskSnafu},
    layout::{FileLayout, FormatVersion, WriteOptions},
};

const CREATED_BY: &str = concat!("target-parquet version ", env!("CARGO_PKG_VERSION"));

/// Writes each batch as a new Parquet file under the destination directory.
#[derive(Debug, Clone)]
pub struct ParquetFileWriter {
    inner: Arc<ParquetFileWriterInner>,
}

#[derive(Debug)]
struct ParquetFileWriterInner {
    layout: FileLayout,
    compression: Option<Compression>,
    format_version: FormatVersion,
}

impl ParquetFileWriter {
    pub fn try_new(options: WriteOptions) -> Result<Self> {
        let layout = FileLayout::create(&options)?;
        if options.streams_in_separate_folder {
            info!("writing streams in separate folders");
        }

        Ok(Self {
            inner: Arc::new(ParquetFileWriterInner {
                layout,
                compression: options.compression,
                format_version: options.format_version,
            }),
        })
    }

    pub fn layout(&self) -> &FileLayout {
        &self.inner.layout
    }

    /// Encodes and writes the batch on the current thread.
    pub fn write_blocking(&self, stream: &str, records: Vec<FlatRecord>) -> Result<PathBuf> {
        ensure!(!records.is_empty(), EmptyBatchSnafu { stream });

        let batch = build_record_batch(stream, &records)?;
        drop(records);

        let path = self.inner.layout.next_file_path(stream)?;
        info!(stream, path = %path.display(), num_rows = batch.num_rows(), "writing parquet file");

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .context(IoSnafu { path: &path })?;

        let written = ArrowWriter::try_new(file, batch.schema(), Some(self.properties(stream)))
            .and_then(|mut writer| {
                writer.write(&batch)?;
                writer.close()
            });

        if let Err(err) = written {
            // Leave no partial file behind.
            if let Err(remove_err) = std::fs::remove_file(&path) {
                debug!(path = %path.display(), error = %remove_err, "failed to remove partial file");
            }
            return Err(err).context(ParquetSnafu {});
        }

        Ok(path)
    }

    fn properties(&self, stream: &str) -> WriterProperties {
        let compression = self
            .inner
            .compression
            .map(|c| c.codec())
            .unwrap_or(ParquetCompression::UNCOMPRESSED);
        let kv_metadata = vec![KeyValue::new(
            "target-parquet:stream".to_string(),
            stream.to_string(),
        )];

        WriterProperties::builder()
            .set_compression(compression)
            .set_writer_version(self.inner.format_version.writer_version())
            .set_key_value_metadata(kv_metadata.into())
            .set_created_by(CREATED_BY.to_string())
            .build()
    }
}

#[async_trait::async_trait]
impl FileWriter for ParquetFileWriter {
    async fn write(&self, stream: &str, records: Vec<FlatRecord>) -> Result<PathBuf> {
        let writer = self.clone();
        let stream = stream.to_string();

        tokio::task::spawn_blocking(move || writer.write_blocking(&stream, records))
            .await
            .context(TaskSnafu {})?
    }
}
