//! Content writer
//!
//! Appends records into a freshly allocated region.

use bytes::{BufMut, BytesMut};

use crate::error::{PackError, Result};
use crate::format::Descriptor;

/// Sequential writer for a new content region of known size
pub struct ContentWriter {
    buf: BytesMut,
    expected: usize,
}

impl ContentWriter {
    /// Allocate room for exactly `expected` bytes
    pub fn with_size(expected: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(expected),
            expected,
        }
    }

    /// Current write cursor
    pub fn position(&self) -> u32 {
        self.buf.len() as u32
    }

    /// Copy an existing `[hash][payload]` record verbatim.
    ///
    /// Returns the descriptor rebased onto the new position.
    pub fn copy_record(&mut self, previous: Descriptor, record: &[u8]) -> Descriptor {
        debug_assert_eq!(record.len(), previous.size() as usize);
        let rebased = previous.rebase(self.position());
        self.buf.put_slice(record);
        rebased
    }

    /// Write a new record from its hash and encoded payload
    pub fn write_record(&mut self, hash: u32, payload: &[u8]) -> Descriptor {
        let size = (payload.len() + 4) as u32;
        let descriptor = Descriptor::new(size, self.position());
        self.buf.put_u32(hash);
        self.buf.put_slice(payload);
        descriptor
    }

    /// Hand back the region, checking it matches the precomputed size
    pub fn finish(self) -> Result<BytesMut> {
        if self.buf.len() != self.expected {
            return Err(PackError::MalformedBuffer(format!(
                "Content size mismatch: expected {} bytes, wrote {}",
                self.expected,
                self.buf.len()
            )));
        }
        Ok(self.buf)
    }
}
