use std::{
    path::{MAIN_SEPARATOR_STR, Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use parquet::file::properties::WriterVersion;
use snafu::ResultExt;

use crate::{
    compression::Compression,
    error::{IoSnafu, Result, UnsupportedFormatVersionSnafu},
};

const FILE_EXTENSION: &str = "parquet";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S-%6f";

/// Parquet format version written to the files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatVersion {
    #[default]
    V1,
    V2,
}

/// Everything the writer needs to know about where and how to write.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub destination_path: PathBuf,
    pub compression: Option<Compression>,
    pub format_version: FormatVersion,
    pub streams_in_separate_folder: bool,
}

/// Decides where each flushed batch lands on disk.
///
/// File names are `<stream><separator><timestamp><compression>.parquet`
/// where the separator is `-`, or a directory separator when every stream
/// gets its own folder.
#[derive(Debug)]
pub struct FileLayout {
    root: PathBuf,
    compression: Option<Compression>,
    streams_in_separate_folder: bool,
    clock: FileClock,
}

/// Issues strictly increasing timestamps at microsecond resolution.
#[derive(Debug, Default)]
struct FileClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl FormatVersion {
    pub fn parse(version: &str) -> Result<Self> {
        match version {
            "1.0" => Ok(Self::V1),
            "2.0" | "2.4" | "2.6" => Ok(Self::V2),
            _ => UnsupportedFormatVersionSnafu { version }.fail(),
        }
    }

    pub fn writer_version(&self) -> WriterVersion {
        match self {
            Self::V1 => WriterVersion::PARQUET_1_0,
            Self::V2 => WriterVersion::PARQUET_2_0,
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            destination_path: PathBuf::from("."),
            compression: None,
            format_version: FormatVersion::default(),
            streams_in_separate_folder: false,
        }
    }
}

impl FileLayout {
    /// Creates the layout, creating the destination directory if needed.
    pub fn create(options: &WriteOptions) -> Result<Self> {
        let root = options.destination_path.clone();
        std::fs::create_dir_all(&root).context(IoSnafu { path: &root })?;

        Ok(Self {
            root,
            compression: options.compression,
            streams_in_separate_folder: options.streams_in_separate_folder,
            clock: FileClock::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of a new file for `stream`, creating the stream's
    /// folder when streams are written separately.
    pub fn next_file_path(&self, stream: &str) -> Result<PathBuf> {
        if self.streams_in_separate_folder {
            let folder = self.root.join(stream);
            std::fs::create_dir_all(&folder).context(IoSnafu { path: &folder })?;
        }

        Ok(self.file_path(stream, self.clock.next()))
    }

    pub fn file_path(&self, stream: &str, timestamp: DateTime<Utc>) -> PathBuf {
        let separator = if self.streams_in_separate_folder {
            MAIN_SEPARATOR_STR
        } else {
            "-"
        };
        let compression = self.compression.map(|c| c.extension()).unwrap_or_default();
        let file_name = format!(
            "{stream}{separator}{}{compression}.{FILE_EXTENSION}",
            timestamp.format(TIMESTAMP_FORMAT)
        );

        self.root.join(file_name)
    }
}

impl FileClock {
    fn next(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().trunc_subsecs(6);
        let next = match *last {
            Some(previous) if now <= previous => previous + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(next);
        next
    }
}
