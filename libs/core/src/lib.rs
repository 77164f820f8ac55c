//! Wirecall Core - binary wire format
//!
//! Request and response headers, the varint helpers they are built from,
//! the body checksum and a pool for recycling header values. Nothing in this
//! crate performs I/O; see `wirecall-codec` for the stream side.
//!
//! # Example
//!
//! ```
//! use wirecall_core::{CompressType, Header, RequestHeader};
//!
//! let header = RequestHeader {
//!     compress_type: CompressType::RAW,
//!     method: "Add".to_string(),
//!     id: 12345,
//!     request_len: 123,
//!     checksum: 12345,
//! };
//! let bytes = header.marshal();
//!
//! let mut decoded = RequestHeader::default();
//! decoded.unmarshal(&bytes).unwrap();
//! assert_eq!(decoded, header);
//! ```

pub mod compress_type;
pub mod error;
pub mod header;
pub mod pool;
pub mod varint;

// Re-exports for convenience
pub use compress_type::CompressType;
pub use error::{HeaderError, Result};
pub use header::{checksum, Header, RequestHeader, ResponseHeader};
pub use pool::{HeaderPool, Pooled, REQUEST_POOL, RESPONSE_POOL};
