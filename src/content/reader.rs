//! Content reader
//!
//! Read-only view over the content region of a buffer.

use bytes::Bytes;

use crate::error::{PackError, Result};
use crate::format::{Descriptor, HASH_SIZE};

/// Shared, read-only view of a content region.
///
/// Cloning is cheap and never copies the underlying bytes, so snapshots
/// derived from one another can keep reading the same region.
#[derive(Debug, Clone, Default)]
pub struct ContentView {
    bytes: Bytes,
}

impl ContentView {
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Bounds-checked slice of `size` bytes at `offset`
    pub fn read(&self, offset: u32, size: u32) -> Result<Bytes> {
        let start = offset as usize;
        let end = start + size as usize;
        if end > self.bytes.len() {
            return Err(PackError::OutOfBounds {
                offset,
                size,
                len: self.bytes.len(),
            });
        }
        Ok(self.bytes.slice(start..end))
    }

    /// Whole record (hash + payload) behind a committed descriptor
    pub fn record(&self, descriptor: Descriptor) -> Result<Bytes> {
        if (descriptor.size() as usize) < HASH_SIZE {
            return Err(PackError::MalformedBuffer(format!(
                "Record at offset {} is shorter than its hash ({} bytes)",
                descriptor.offset(),
                descriptor.size()
            )));
        }
        self.read(descriptor.offset(), descriptor.size())
    }

    /// Payload of the record behind a committed descriptor
    pub fn payload(&self, descriptor: Descriptor) -> Result<Bytes> {
        Ok(self.record(descriptor)?.slice(HASH_SIZE..))
    }

    /// Stored hash of the record, read without decoding the payload
    pub fn stored_hash(&self, descriptor: Descriptor) -> Result<u32> {
        let record = self.record(descriptor)?;
        Ok(u32::from_be_bytes([record[0], record[1], record[2], record[3]]))
    }
}
