//! Value codecs
//!
//! The store never looks inside a value. Turning values into payload bytes
//! and back is delegated to a [`ValueCodec`] handed to the constructor.

use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Boxed error returned by codec implementations
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Encode/decode hooks for the values held by a store.
///
/// `hash` must be equal for values that are equal, and must agree with the
/// hash stored in front of each record: records are written with
/// `hash(value)` and reads compare against it when verification is enabled.
pub trait ValueCodec<V>: Send + Sync {
    /// Serialize a value into its payload bytes
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError>;

    /// Rebuild a value from its payload bytes
    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError>;

    /// 32-bit hash of a decoded value.
    ///
    /// Defaults to the CRC32 of the encoded payload, which is stable for any
    /// deterministic encoding.
    fn hash(&self, value: &V) -> Result<u32, CodecError> {
        Ok(crc32fast::hash(&self.encode(value)?))
    }
}

// =============================================================================
// Bundled Codecs
// =============================================================================

/// Identity codec over raw byte payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl ValueCodec<Bytes> for RawCodec {
    fn encode(&self, value: &Bytes) -> Result<Vec<u8>, CodecError> {
        Ok(value.to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Bytes, CodecError> {
        Ok(Bytes::copy_from_slice(bytes))
    }

    fn hash(&self, value: &Bytes) -> Result<u32, CodecError> {
        Ok(crc32fast::hash(value))
    }
}

/// UTF-8 string codec
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl ValueCodec<String> for Utf8Codec {
    fn encode(&self, value: &String) -> Result<Vec<u8>, CodecError> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn hash(&self, value: &String) -> Result<u32, CodecError> {
        Ok(crc32fast::hash(value.as_bytes()))
    }
}

/// Codec for any serde type, using bincode's compact encoding
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for BincodeCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BincodeCodec")
    }
}

impl<T> ValueCodec<T> for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
