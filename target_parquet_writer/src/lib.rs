//! Materializes batches of flat records as immutable files.
//!
//! The [`FileWriter`] trait is the seam between the batching pipeline and
//! storage. [`ParquetFileWriter`] is the production implementation;
//! [`InMemoryFileWriter`] keeps batches in memory.
use std::path::PathBuf;

use target_parquet_schema::FlatRecord;

pub mod batch;
pub mod compression;
pub mod error;
pub mod layout;
pub mod memory;
pub mod parquet;

pub use self::compression::Compression;
pub use self::error::{Result, WriterError};
pub use self::layout::{FileLayout, FormatVersion, WriteOptions};
pub use self::memory::{InMemoryFileWriter, WrittenFile};
pub use self::parquet::ParquetFileWriter;

/// Writes one batch of records for a stream as one durable file.
#[async_trait::async_trait]
pub trait FileWriter: Send + Sync + 'static {
    /// Writes `records`, in order, into a new file and returns its path.
    ///
    /// The writer takes ownership of the batch so that its memory is released
    /// as soon as the file is written.
    async fn write(&self, stream: &str, records: Vec<FlatRecord>) -> Result<PathBuf>;
}
