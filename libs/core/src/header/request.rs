use bytes::{BufMut, Bytes, BytesMut};

use crate::compress_type::CompressType;
use crate::error::Result;
use crate::header::{put_string, string_len, Decoder, Header};
use crate::varint::{put_uvarint, uvarint_len};

/// Header preceding every request body
///
/// ```text
/// | compress_type | method           | id      | request_len | checksum |
/// | u16 LE        | uvarint + string | uvarint | uvarint     | u32 LE   |
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeader {
    pub compress_type: CompressType,
    /// Service method, `Service.Method`
    pub method: String,
    /// Sequence number chosen by the client
    pub id: u64,
    /// Byte count of the compressed body that follows the header
    pub request_len: u32,
    /// CRC-32 of the compressed body; zero means "not supplied"
    pub checksum: u32,
}

impl RequestHeader {
    fn encoded_len(&self) -> usize {
        2 + string_len(&self.method)
            + uvarint_len(self.id)
            + uvarint_len(u64::from(self.request_len))
            + 4
    }
}

impl Header for RequestHeader {
    fn marshal(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u16_le(self.compress_type.as_u16());
        put_string(&mut buf, &self.method);
        put_uvarint(&mut buf, self.id);
        put_uvarint(&mut buf, u64::from(self.request_len));
        buf.put_u32_le(self.checksum);
        buf.freeze()
    }

    fn unmarshal(&mut self, data: &[u8]) -> Result<()> {
        let mut decoder = Decoder::new(data)?;
        let decoded = Self {
            compress_type: CompressType(decoder.u16_le()?),
            method: decoder.string()?,
            id: decoder.uvarint()?,
            request_len: decoder.uvarint_u32()?,
            checksum: decoder.u32_le()?,
        };
        *self = decoded;
        Ok(())
    }

    fn reset(&mut self) {
        self.compress_type = CompressType::RAW;
        self.method.clear();
        self.id = 0;
        self.request_len = 0;
        self.checksum = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeaderError;
    use proptest::prelude::*;
    use rstest::rstest;

    const ADD_BYTES: [u8; 13] = [
        0x00, 0x00, 0x03, 0x41, 0x64, 0x64, 0xb9, 0x60, 0x7b, 0x39, 0x30, 0x00, 0x00,
    ];

    fn add_header() -> RequestHeader {
        RequestHeader {
            compress_type: CompressType::RAW,
            method: "Add".to_string(),
            id: 12345,
            request_len: 123,
            checksum: 12345,
        }
    }

    #[test]
    fn marshal_matches_known_layout() {
        assert_eq!(add_header().marshal().as_ref(), &ADD_BYTES);
    }

    #[test]
    fn unmarshal_known_layout() {
        let mut header = RequestHeader::default();
        header.unmarshal(&ADD_BYTES).unwrap();
        assert_eq!(header, add_header());
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::single_byte(&[0x00])]
    #[case::missing_checksum(&ADD_BYTES[..11])]
    #[case::partial_checksum(&ADD_BYTES[..12])]
    #[case::cut_inside_method(&ADD_BYTES[..4])]
    fn truncated_input_is_malformed(#[case] data: &[u8]) {
        let mut header = RequestHeader::default();
        let err = header.unmarshal(data).unwrap_err();
        assert!(matches!(err, HeaderError::Malformed(_)));
        assert_eq!(header, RequestHeader::default());
    }

    #[test]
    fn failed_unmarshal_keeps_previous_value() {
        let mut header = add_header();
        assert!(header.unmarshal(&ADD_BYTES[..6]).is_err());
        assert_eq!(header, add_header());
    }

    #[test]
    fn request_len_beyond_u32_is_malformed() {
        let mut data = vec![0x00, 0x00, 0x00, 0x01];
        put_uvarint(&mut data, u64::from(u32::MAX) + 1);
        data.extend_from_slice(&[0, 0, 0, 0]);
        assert!(RequestHeader::default().unmarshal(&data).is_err());
    }

    #[test]
    fn reset_clears_every_field() {
        let mut header = add_header();
        header.compress_type = CompressType::ZLIB;
        header.reset();
        assert_eq!(header, RequestHeader::default());
    }

    proptest! {
        #[test]
        fn round_trips(
            compress in any::<u16>(),
            method in ".{0,64}",
            id in any::<u64>(),
            request_len in any::<u32>(),
            checksum in any::<u32>(),
        ) {
            let header = RequestHeader {
                compress_type: CompressType(compress),
                method,
                id,
                request_len,
                checksum,
            };
            let bytes = header.marshal();
            prop_assert_eq!(bytes.len(), header.encoded_len());

            let mut decoded = RequestHeader::default();
            decoded.unmarshal(&bytes).unwrap();
            prop_assert_eq!(decoded, header);
        }

        #[test]
        fn every_strict_prefix_is_rejected(method in "[a-zA-Z.]{0,16}", id in any::<u64>()) {
            let header = RequestHeader { method, id, checksum: 7, ..RequestHeader::default() };
            let bytes = header.marshal();
            for cut in 0..bytes.len() {
                prop_assert!(RequestHeader::default().unmarshal(&bytes[..cut]).is_err());
            }
        }
    }
}
