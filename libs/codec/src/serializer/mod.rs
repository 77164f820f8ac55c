use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub mod bincode;
pub mod json;

pub use self::bincode::BincodeSerializer;
pub use self::json::JsonSerializer;

/// Serializer trait for turning call arguments and replies into bodies
pub trait Serializer: Send + Sync {
    /// Encode a value into bytes
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode bytes into a value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Encode an optional value; `None` is an empty body
    fn encode_opt<T: Serialize + ?Sized>(&self, value: Option<&T>) -> Result<Vec<u8>> {
        match value {
            Some(value) => self.encode(value),
            None => Ok(Vec::new()),
        }
    }

    /// Decode into an optional target; `None` ignores the bytes
    fn decode_into<T: DeserializeOwned>(&self, bytes: &[u8], target: Option<&mut T>) -> Result<()> {
        if let Some(target) = target {
            *target = self.decode(bytes)?;
        }
        Ok(())
    }
}
