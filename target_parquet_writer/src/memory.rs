use std::{
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use snafu::ensure;
use target_parquet_schema::FlatRecord;

use crate::{
    FileWriter,
    error::{EmptyBatchSnafu, Result},
};

/// A batch captured by [`InMemoryFileWriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenFile {
    pub stream: String,
    pub path: PathBuf,
    pub records: Vec<FlatRecord>,
}

/// Keeps every written batch in memory, in write order.
#[derive(Debug, Default)]
pub struct InMemoryFileWriter {
    files: Mutex<Vec<WrittenFile>>,
}

impl InMemoryFileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All batches written so far.
    pub fn files(&self) -> Vec<WrittenFile> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The batches written for `stream`.
    pub fn files_for(&self, stream: &str) -> Vec<WrittenFile> {
        self.files()
            .into_iter()
            .filter(|file| file.stream == stream)
            .collect()
    }
}

#[async_trait::async_trait]
impl FileWriter for InMemoryFileWriter {
    async fn write(&self, stream: &str, records: Vec<FlatRecord>) -> Result<PathBuf> {
        ensure!(!records.is_empty(), EmptyBatchSnafu { stream });

        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        let path = PathBuf::from(format!("memory/{stream}-{:06}.parquet", files.len()));
        files.push(WrittenFile {
            stream: stream.to_string(),
            path: path.clone(),
            records,
        });

        Ok(path)
    }
}
