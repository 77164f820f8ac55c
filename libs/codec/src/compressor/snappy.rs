use std::io::{Read, Write};

use snap::read::FrameDecoder;
use snap::write::FrameEncoder;

use crate::compressor::Compressor;
use crate::error::{Error, Result};

/// Snappy compressor using the framing format
///
/// The framed stream (stream identifier chunk plus checksummed chunks) is
/// what buffered snappy writers emit, so bodies stay readable by peers that
/// use one
#[derive(Debug, Clone, Copy, Default)]
pub struct SnappyCompressor;

impl Compressor for SnappyCompressor {
    fn zip(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = FrameEncoder::new(Vec::new());
        encoder
            .write_all(data)
            .map_err(|e| Error::Compression(e.to_string()))?;
        encoder
            .into_inner()
            .map_err(|e| Error::Compression(e.to_string()))
    }

    fn unzip(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        FrameDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| Error::Compression(e.to_string()))?;
        Ok(out)
    }
}
