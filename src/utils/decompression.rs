#[cfg(feature = "compression-gzip")]
use std::io::Read;

use crate::errors::{SourceError, SourceResult};

/// Supported compression formats detected by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Uncompressed,
}

/// Magic file detection and decompression utility
pub struct DecompressionService;

impl DecompressionService {
    /// Detect compression format using magic bytes
    pub fn detect_compression_format(data: &[u8]) -> CompressionFormat {
        match infer::get(data).map(|kind| kind.mime_type()) {
            Some("application/gzip") => CompressionFormat::Gzip,
            _ => CompressionFormat::Uncompressed,
        }
    }

    /// Decompress data based on detected format
    pub fn decompress(data: Vec<u8>) -> SourceResult<Vec<u8>> {
        match Self::detect_compression_format(&data) {
            CompressionFormat::Gzip => Self::decompress_gzip(data),
            CompressionFormat::Uncompressed => Ok(data),
        }
    }

    #[cfg(feature = "compression-gzip")]
    fn decompress_gzip(data: Vec<u8>) -> SourceResult<Vec<u8>> {
        let mut decoder = flate2::read::GzDecoder::new(data.as_slice());
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| SourceError::Decompression {
                message: format!("Failed to decompress gzip data: {e}"),
            })?;
        Ok(decompressed)
    }

    #[cfg(not(feature = "compression-gzip"))]
    fn decompress_gzip(_data: Vec<u8>) -> SourceResult<Vec<u8>> {
        Err(SourceError::Decompression {
            message: "gzip support is not enabled (feature compression-gzip)".to_string(),
        })
    }
}
