use crate::compressor::Compressor;
use crate::error::Result;

/// Pass-through compressor
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCompressor;

impl Compressor for RawCompressor {
    fn zip(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn unzip(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}
