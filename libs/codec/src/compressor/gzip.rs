use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::compressor::Compressor;
use crate::error::{Error, Result};

/// Gzip (RFC 1952) compressor
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCompressor;

impl Compressor for GzipCompressor {
    fn zip(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(data)
            .map_err(|e| Error::Compression(e.to_string()))?;
        encoder.finish().map_err(|e| Error::Compression(e.to_string()))
    }

    fn unzip(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| Error::Compression(e.to_string()))?;
        Ok(out)
    }
}
