//! Shared helpers for map tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use packmap::{CodecError, ValueCodec};

/// UTF-8 codec that counts decodes and can be told to fail
#[derive(Clone, Default)]
pub struct CountingCodec {
    pub decodes: Arc<AtomicUsize>,
    pub encodes: Arc<AtomicUsize>,
    /// Values for which `encode` fails
    pub poison: Option<String>,
}

impl CountingCodec {
    pub fn poisoned(value: &str) -> Self {
        Self {
            poison: Some(value.to_string()),
            ..Self::default()
        }
    }

    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

impl ValueCodec<String> for CountingCodec {
    fn encode(&self, value: &String) -> Result<Vec<u8>, CodecError> {
        if self.poison.as_deref() == Some(value.as_str()) {
            return Err(format!("refusing to encode {:?}", value).into());
        }
        self.encodes.fetch_add(1, Ordering::SeqCst);
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn hash(&self, value: &String) -> Result<u32, CodecError> {
        Ok(crc32fast::hash(value.as_bytes()))
    }
}
