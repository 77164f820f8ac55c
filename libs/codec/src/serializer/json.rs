use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::serializer::Serializer;

/// JSON serializer, handy when the peer is not written in Rust
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Args {
        a: f64,
        b: f64,
    }

    #[test]
    fn encodes_field_names() {
        let bytes = JsonSerializer.encode(&Args { a: 1.0, b: 2.0 }).unwrap();
        assert_eq!(bytes, br#"{"a":1.0,"b":2.0}"#);
    }

    #[test]
    fn none_target_is_a_no_op() {
        JsonSerializer
            .decode_into::<Args>(b"not json", None)
            .unwrap();
    }

    #[test]
    fn none_value_is_empty() {
        assert!(JsonSerializer.encode_opt::<Args>(None).unwrap().is_empty());
    }
}
