use bytes::{Buf, BufMut, Bytes};

use crate::error::{HeaderError, Result};
use crate::varint::{put_uvarint, uvarint, uvarint_len};

pub mod request;
pub mod response;

pub use self::request::RequestHeader;
pub use self::response::ResponseHeader;

/// Common behaviour of the two header records
pub trait Header: Default + Send + 'static {
    /// Encode into the exact wire layout
    fn marshal(&self) -> Bytes;

    /// Decode `data` into `self`
    ///
    /// On error `self` is left as it was before the call
    fn unmarshal(&mut self, data: &[u8]) -> Result<()>;

    /// Clear every field so a recycled value carries nothing over
    fn reset(&mut self);
}

/// CRC-32 (IEEE) of a compressed body
pub fn checksum(body: &[u8]) -> u32 {
    crc32fast::hash(body)
}

pub(crate) fn string_len(s: &str) -> usize {
    uvarint_len(s.len() as u64) + s.len()
}

pub(crate) fn put_string(buf: &mut impl BufMut, s: &str) {
    put_uvarint(buf, s.len() as u64);
    buf.put_slice(s.as_bytes());
}

/// Bounds-checked reader over header bytes
pub(crate) struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(HeaderError::malformed("empty header"));
        }
        Ok(Self { data })
    }

    pub(crate) fn u16_le(&mut self) -> Result<u16> {
        if self.data.remaining() < 2 {
            return Err(HeaderError::malformed("truncated u16"));
        }
        Ok(self.data.get_u16_le())
    }

    pub(crate) fn u32_le(&mut self) -> Result<u32> {
        if self.data.remaining() < 4 {
            return Err(HeaderError::malformed("truncated u32"));
        }
        Ok(self.data.get_u32_le())
    }

    pub(crate) fn uvarint(&mut self) -> Result<u64> {
        let (value, n) =
            uvarint(self.data).ok_or(HeaderError::malformed("truncated or overlong varint"))?;
        self.data.advance(n);
        Ok(value)
    }

    pub(crate) fn uvarint_u32(&mut self) -> Result<u32> {
        u32::try_from(self.uvarint()?).map_err(|_| HeaderError::malformed("length exceeds u32"))
    }

    pub(crate) fn string(&mut self) -> Result<String> {
        let len = usize::try_from(self.uvarint()?)
            .map_err(|_| HeaderError::malformed("string length overflow"))?;
        if self.data.remaining() < len {
            return Err(HeaderError::malformed("truncated string"));
        }
        let (raw, rest) = self.data.split_at(len);
        self.data = rest;
        String::from_utf8(raw.to_vec()).map_err(|_| HeaderError::malformed("string is not utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_crc32_ieee() {
        assert_eq!(checksum(b"123456789"), 0xcbf4_3926);
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn decoder_rejects_empty_input() {
        assert!(Decoder::new(&[]).is_err());
    }

    #[test]
    fn decoder_rejects_short_string() {
        let mut decoder = Decoder::new(&[0x05, b'a', b'b']).unwrap();
        assert_eq!(
            decoder.string(),
            Err(HeaderError::Malformed("truncated string"))
        );
    }
}
