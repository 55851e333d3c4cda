//! Compactor
//!
//! Rewrites directory and content into a fresh buffer. Committed records are
//! copied verbatim; pending ones are encoded and hashed. The new buffer is
//! built off to the side, so a failure leaves the live one untouched.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::cache::DecodeCache;
use crate::codec::ValueCodec;
use crate::content::{ContentView, ContentWriter};
use crate::directory::Directory;
use crate::error::{PackError, Result};
use crate::format::{HeaderRecord, HASH_SIZE, LENGTH_PREFIX_SIZE, RECORD_SIZE};

/// Output of a successful compaction
pub(crate) struct Compacted {
    pub directory: Directory,
    pub buffer: Bytes,
    pub header: Bytes,
    pub content: ContentView,
}

/// Staged pending entry: encoded payload and value hash
struct Staged {
    payload: Vec<u8>,
    hash: u32,
}

pub(crate) fn compact<V>(
    directory: &Directory,
    cache: &DecodeCache<V>,
    content: &ContentView,
    codec: &dyn ValueCodec<V>,
    max_content_size: u32,
) -> Result<Compacted> {
    // Pass 1: size the new regions and encode pending values
    let mut content_size: u64 = 0;
    let mut record_count: usize = 0;
    let mut staged: HashMap<Uuid, Staged> = HashMap::new();

    for (id, descriptor) in directory.iter() {
        record_count += 1;

        if !descriptor.is_pending() {
            content_size += descriptor.size() as u64;
            continue;
        }

        let value = cache.get(&id).and_then(|e| e.value()).ok_or_else(|| {
            PackError::MalformedBuffer(format!("Pending entry {} has no cached value", id))
        })?;

        let payload = codec
            .encode(value)
            .map_err(|source| PackError::Encode { id, source })?;
        let hash = codec
            .hash(value)
            .map_err(|source| PackError::Encode { id, source })?;

        let record_size = payload.len() + HASH_SIZE;
        if record_size > u32::MAX as usize {
            return Err(PackError::CapacityExceeded {
                what: "Record",
                len: record_size,
            });
        }

        trace!(%id, size = record_size, "encoded pending entry");
        content_size += record_size as u64;
        staged.insert(id, Staged { payload, hash });
    }

    if content_size > max_content_size as u64 {
        return Err(PackError::CapacityExceeded {
            what: "Content region",
            len: content_size as usize,
        });
    }

    let header_size = record_count * RECORD_SIZE;
    if header_size > u32::MAX as usize {
        return Err(PackError::CapacityExceeded {
            what: "Header",
            len: header_size,
        });
    }

    // Pass 2: same iteration order, the updated directory is output only
    let mut header = BytesMut::with_capacity(header_size);
    let mut writer = ContentWriter::with_size(content_size as usize);
    let mut rewritten = directory.clone();
    let mut copied = 0usize;

    for (id, descriptor) in directory.iter() {
        let placed = if descriptor.is_pending() {
            let entry = staged.remove(&id).ok_or_else(|| {
                PackError::MalformedBuffer(format!("Entry {} was not staged", id))
            })?;
            writer.write_record(entry.hash, &entry.payload)
        } else {
            let record = content.record(descriptor)?;
            copied += 1;
            writer.copy_record(descriptor, &record)
        };

        HeaderRecord::new(id, placed).encode(&mut header);
        rewritten = rewritten.insert(id, placed);
    }

    let content_bytes = writer.finish()?;

    let mut buffer =
        BytesMut::with_capacity(LENGTH_PREFIX_SIZE + header_size + content_bytes.len());
    buffer.put_u32(header_size as u32);
    buffer.put_slice(&header);
    buffer.put_slice(&content_bytes);
    let buffer = buffer.freeze();

    let header_end = LENGTH_PREFIX_SIZE + header_size;
    debug!(
        records = record_count,
        copied,
        encoded = record_count - copied,
        content_bytes = content_bytes.len(),
        "compacted buffer"
    );

    Ok(Compacted {
        directory: rewritten,
        header: buffer.slice(LENGTH_PREFIX_SIZE..header_end),
        content: ContentView::new(buffer.slice(header_end..)),
        buffer,
    })
}
