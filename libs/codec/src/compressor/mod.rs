use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use wirecall_core::CompressType;

use crate::error::{Error, Result};

pub mod gzip;
pub mod raw;
pub mod snappy;
pub mod zlib;

pub use self::gzip::GzipCompressor;
pub use self::raw::RawCompressor;
pub use self::snappy::SnappyCompressor;
pub use self::zlib::ZlibCompressor;

/// Compressor trait for transforming message bodies
///
/// Implementations are stateless; the same value may be used from several
/// connections at once
pub trait Compressor: Send + Sync {
    /// Compress a serialized body
    fn zip(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Restore a body produced by `zip`
    fn unzip(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Compressors keyed by the tag carried in headers
#[derive(Clone)]
pub struct CompressorRegistry {
    compressors: HashMap<CompressType, Arc<dyn Compressor>>,
}

impl CompressorRegistry {
    /// A registry with nothing registered
    pub fn empty() -> Self {
        Self {
            compressors: HashMap::new(),
        }
    }

    /// Register `compressor` under `tag`, replacing any previous entry
    pub fn register(&mut self, tag: CompressType, compressor: impl Compressor + 'static) -> &mut Self {
        self.compressors.insert(tag, Arc::new(compressor));
        self
    }

    /// Builder-style `register`
    pub fn with(mut self, tag: CompressType, compressor: impl Compressor + 'static) -> Self {
        self.register(tag, compressor);
        self
    }

    pub fn contains(&self, tag: CompressType) -> bool {
        self.compressors.contains_key(&tag)
    }

    /// Look up `tag`, failing with [`Error::CompressorNotFound`]
    pub fn get(&self, tag: CompressType) -> Result<&dyn Compressor> {
        self.compressors
            .get(&tag)
            .map(|c| c.as_ref())
            .ok_or(Error::CompressorNotFound(tag))
    }
}

impl Default for CompressorRegistry {
    /// Raw, gzip, snappy and zlib under their standard tags
    fn default() -> Self {
        Self::empty()
            .with(CompressType::RAW, RawCompressor)
            .with(CompressType::GZIP, GzipCompressor)
            .with(CompressType::SNAPPY, SnappyCompressor)
            .with(CompressType::ZLIB, ZlibCompressor)
    }
}

impl fmt::Debug for CompressorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.compressors.keys().copied().collect();
        tags.sort();
        f.debug_struct("CompressorRegistry").field("tags", &tags).finish()
    }
}
