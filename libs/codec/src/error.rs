use thiserror::Error;
use wirecall_core::{CompressType, HeaderError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("Unexpected checksum: header carries {expected:#010x}, body hashes to {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Compressor not found: {0}")]
    CompressorNotFound(CompressType),

    #[error("Compressor type mismatch: expected {expected}, got {actual}")]
    CompressorMismatch {
        expected: CompressType,
        actual: CompressType,
    },

    #[error("Invalid sequence number: {0}")]
    InvalidSequence(u64),

    #[error("Response for unknown sequence number: {0}")]
    UnexpectedSequence(u64),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
