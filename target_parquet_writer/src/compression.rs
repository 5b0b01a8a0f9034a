use parquet::basic::{BrotliLevel, Compression as ParquetCompression, GzipLevel, ZstdLevel};
use tracing::warn;

/// Compression codecs accepted in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Snappy,
    Gzip,
    Brotli,
    Zstd,
    Lz4,
}

impl Compression {
    /// Parses a codec name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SNAPPY" => Some(Self::Snappy),
            "GZIP" => Some(Self::Gzip),
            "BROTLI" => Some(Self::Brotli),
            "ZSTD" => Some(Self::Zstd),
            "LZ4" => Some(Self::Lz4),
            _ => None,
        }
    }

    /// Resolves the configured codec. Unknown codecs fall back to no compression.
    pub fn from_config(name: Option<&str>) -> Option<Self> {
        let name = name.filter(|name| !name.is_empty())?;
        let compression = Self::parse(name);
        if compression.is_none() {
            warn!(
                compression_method = name,
                "unsupported compression method, files will not be compressed"
            );
        }
        compression
    }

    /// Suffix inserted before the file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Snappy => ".snappy",
            Self::Gzip => ".gz",
            Self::Brotli => ".br",
            Self::Zstd => ".zstd",
            Self::Lz4 => ".lz4",
        }
    }

    pub fn codec(&self) -> ParquetCompression {
        match self {
            Self::Snappy => ParquetCompression::SNAPPY,
            Self::Gzip => ParquetCompression::GZIP(GzipLevel::default()),
            Self::Brotli => ParquetCompression::BROTLI(BrotliLevel::default()),
            Self::Zstd => ParquetCompression::ZSTD(ZstdLevel::default()),
            Self::Lz4 => ParquetCompression::LZ4_RAW,
        }
    }
}
