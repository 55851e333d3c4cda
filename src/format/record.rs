//! Header records
//!
//! Fixed 24-byte `[identifier][descriptor]` entries.

use bytes::BufMut;
use uuid::Uuid;

use crate::error::{PackError, Result};

use super::{Descriptor, IDENTIFIER_SIZE, LENGTH_PREFIX_SIZE, RECORD_SIZE};

/// One decoded header entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRecord {
    pub id: Uuid,
    pub descriptor: Descriptor,
}

impl HeaderRecord {
    pub fn new(id: Uuid, descriptor: Descriptor) -> Self {
        Self { id, descriptor }
    }

    /// Decode a record from exactly `RECORD_SIZE` bytes
    pub fn decode(buf: &[u8]) -> Self {
        debug_assert_eq!(buf.len(), RECORD_SIZE);
        let mut id = [0u8; IDENTIFIER_SIZE];
        id.copy_from_slice(&buf[..IDENTIFIER_SIZE]);
        let mut bits = [0u8; 8];
        bits.copy_from_slice(&buf[IDENTIFIER_SIZE..RECORD_SIZE]);

        Self {
            id: Uuid::from_bytes(id),
            descriptor: Descriptor::from_bits(u64::from_be_bytes(bits)),
        }
    }

    /// Append the record's 24 bytes
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_slice(self.id.as_bytes());
        out.put_u64(self.descriptor.bits());
    }
}

/// Read and validate the leading header length of a buffer.
///
/// Fails if the prefix is missing, the length is not a whole number of
/// records, or the header would run past the end of the buffer.
pub fn read_header_length(buf: &[u8]) -> Result<usize> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Err(PackError::MalformedBuffer(format!(
            "Incomplete length prefix: expected {} bytes, got {}",
            LENGTH_PREFIX_SIZE,
            buf.len()
        )));
    }

    let header_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    if header_len % RECORD_SIZE != 0 {
        return Err(PackError::MalformedBuffer(format!(
            "Header length {} is not a multiple of {}",
            header_len, RECORD_SIZE
        )));
    }

    if LENGTH_PREFIX_SIZE + header_len > buf.len() {
        return Err(PackError::MalformedBuffer(format!(
            "Header overruns buffer: header={} bytes, buffer={} bytes",
            header_len,
            buf.len()
        )));
    }

    Ok(header_len)
}
