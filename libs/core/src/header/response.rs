use bytes::{BufMut, Bytes, BytesMut};

use crate::compress_type::CompressType;
use crate::error::Result;
use crate::header::{put_string, string_len, Decoder, Header};
use crate::varint::{put_uvarint, uvarint_len};

/// Header preceding every response body
///
/// ```text
/// | compress_type | id      | error            | response_len | checksum |
/// | u16 LE        | uvarint | uvarint + string | uvarint      | u32 LE   |
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub compress_type: CompressType,
    /// The id of the request this answers, as the client sent it
    pub id: u64,
    /// Error reported by the service; empty on success
    pub error: String,
    pub response_len: u32,
    pub checksum: u32,
}

impl ResponseHeader {
    fn encoded_len(&self) -> usize {
        2 + uvarint_len(self.id)
            + string_len(&self.error)
            + uvarint_len(u64::from(self.response_len))
            + 4
    }
}

impl Header for ResponseHeader {
    fn marshal(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u16_le(self.compress_type.as_u16());
        put_uvarint(&mut buf, self.id);
        put_string(&mut buf, &self.error);
        put_uvarint(&mut buf, u64::from(self.response_len));
        buf.put_u32_le(self.checksum);
        buf.freeze()
    }

    fn unmarshal(&mut self, data: &[u8]) -> Result<()> {
        let mut decoder = Decoder::new(data)?;
        let decoded = Self {
            compress_type: CompressType(decoder.u16_le()?),
            id: decoder.uvarint()?,
            error: decoder.string()?,
            response_len: decoder.uvarint_u32()?,
            checksum: decoder.u32_le()?,
        };
        *self = decoded;
        Ok(())
    }

    fn reset(&mut self) {
        self.compress_type = CompressType::RAW;
        self.id = 0;
        self.error.clear();
        self.response_len = 0;
        self.checksum = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeaderError;
    use proptest::prelude::*;

    const ERROR_BYTES: [u8; 15] = [
        0x00, 0x00, 0xb9, 0x60, 0x05, 0x65, 0x72, 0x72, 0x6f, 0x72, 0x7b, 0x39, 0x30, 0x00, 0x00,
    ];

    fn error_header() -> ResponseHeader {
        ResponseHeader {
            compress_type: CompressType::RAW,
            id: 12345,
            error: "error".to_string(),
            response_len: 123,
            checksum: 12345,
        }
    }

    #[test]
    fn marshal_matches_known_layout() {
        assert_eq!(error_header().marshal().as_ref(), &ERROR_BYTES);
    }

    #[test]
    fn unmarshal_known_layout() {
        let mut header = ResponseHeader::default();
        header.unmarshal(&ERROR_BYTES).unwrap();
        assert_eq!(header, error_header());
    }

    #[test]
    fn empty_and_single_byte_inputs_are_malformed() {
        for data in [&[][..], &[0x00][..]] {
            let mut header = ResponseHeader::default();
            assert!(matches!(
                header.unmarshal(data),
                Err(HeaderError::Malformed(_))
            ));
            assert_eq!(header, ResponseHeader::default());
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut data = ERROR_BYTES.to_vec();
        data.extend_from_slice(&[0xde, 0xad]);
        let mut header = ResponseHeader::default();
        header.unmarshal(&data).unwrap();
        assert_eq!(header, error_header());
    }

    #[test]
    fn reset_clears_every_field() {
        let mut header = error_header();
        header.reset();
        assert_eq!(header, ResponseHeader::default());
    }

    proptest! {
        #[test]
        fn round_trips(
            compress in any::<u16>(),
            id in any::<u64>(),
            error in ".{0,64}",
            response_len in any::<u32>(),
            checksum in any::<u32>(),
        ) {
            let header = ResponseHeader {
                compress_type: CompressType(compress),
                id,
                error,
                response_len,
                checksum,
            };
            let bytes = header.marshal();
            prop_assert_eq!(bytes.len(), header.encoded_len());

            let mut decoded = ResponseHeader::default();
            decoded.unmarshal(&bytes).unwrap();
            prop_assert_eq!(decoded, header);
        }

        #[test]
        fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = ResponseHeader::default().unmarshal(&data);
        }
    }
}
