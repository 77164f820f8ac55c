use bytes::BufMut;

/// Longest encoding of a `u64`
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` to `buf` using the fewest bytes possible
pub fn put_uvarint(buf: &mut impl BufMut, mut value: u64) -> usize {
    let mut written = 1;
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
        written += 1;
    }
    buf.put_u8(value as u8);
    written
}

/// Number of bytes `put_uvarint` would emit for `value`
pub fn uvarint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Decode a varint from the front of `data`
///
/// Returns the value and the number of bytes consumed, or `None` if `data`
/// ends mid-varint or the encoding overflows 64 bits
pub fn uvarint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in data.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return None;
        }
        if byte < 0x80 {
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return None;
            }
            return Some((value | (u64::from(byte) << shift), i + 1));
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(1, &[0x01])]
    #[case(127, &[0x7f])]
    #[case(128, &[0x80, 0x01])]
    #[case(123, &[0x7b])]
    #[case(12345, &[0xb9, 0x60])]
    fn encodes_minimal_bytes(#[case] value: u64, #[case] expected: &[u8]) {
        let mut buf = Vec::new();
        let n = put_uvarint(&mut buf, value);
        assert_eq!(buf, expected);
        assert_eq!(n, expected.len());
        assert_eq!(uvarint_len(value), expected.len());
        assert_eq!(uvarint(expected), Some((value, expected.len())));
    }

    #[test]
    fn max_value_uses_ten_bytes() {
        let mut buf = Vec::new();
        put_uvarint(&mut buf, u64::MAX);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        assert_eq!(uvarint(&buf), Some((u64::MAX, MAX_VARINT_LEN)));
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert_eq!(uvarint(&[]), None);
        assert_eq!(uvarint(&[0x80]), None);
        assert_eq!(uvarint(&[0xff, 0xff]), None);
    }

    #[test]
    fn overflow_is_rejected() {
        let eleven = [0xffu8; 11];
        assert_eq!(uvarint(&eleven), None);

        let mut too_big = [0xffu8; 10];
        too_big[9] = 0x02;
        assert_eq!(uvarint(&too_big), None);
    }
}
