//! Directory Module
//!
//! Identifier → descriptor map, the source of truth for which entries exist
//! and where their records live.
//!
//! ## Data Structure Choice
//! A persistent hash map (`im::HashMap`):
//! - `insert`/`remove` return a new directory in O(log n)
//! - The receiver and every older version stay valid and queryable
//! - Iteration order is unspecified but fixed for a given version

use im::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::format::{Descriptor, HeaderRecord, RECORD_SIZE};

/// Persistent identifier → descriptor map
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: HashMap<Uuid, Descriptor>,
}

impl Directory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory by scanning header records in 24-byte strides.
    ///
    /// Trailing bytes shorter than a record are ignored; callers validate
    /// the header length before handing the region over. A repeated
    /// identifier keeps its last descriptor, and the shadowed records are
    /// dropped by the next compaction.
    pub fn from_header(header: &[u8]) -> Self {
        let mut entries = HashMap::new();
        let mut records = 0usize;
        for chunk in header.chunks_exact(RECORD_SIZE) {
            let record = HeaderRecord::decode(chunk);
            entries.insert(record.id, record.descriptor);
            records += 1;
        }
        if entries.len() < records {
            warn!(
                records,
                entries = entries.len(),
                "header repeats identifiers, keeping the last descriptor of each"
            );
        }
        debug!(entries = entries.len(), "parsed directory");
        Self { entries }
    }

    pub fn get(&self, id: &Uuid) -> Option<Descriptor> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.contains_key(id)
    }

    /// New directory with `id` mapped to `descriptor`
    pub fn insert(&self, id: Uuid, descriptor: Descriptor) -> Self {
        Self {
            entries: self.entries.update(id, descriptor),
        }
    }

    /// New directory without `id`
    pub fn remove(&self, id: &Uuid) -> Self {
        Self {
            entries: self.entries.without(id),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in this version's iteration order
    pub fn iter(&self) -> impl Iterator<Item = (Uuid, Descriptor)> + '_ {
        self.entries.iter().map(|(id, d)| (*id, *d))
    }

    /// Identifiers in this version's iteration order, owning the version
    pub fn into_ids(self) -> impl Iterator<Item = Uuid> {
        self.entries.into_iter().map(|(id, _)| id)
    }
}

// =============================================================================
// Checked Parse
// =============================================================================

impl Directory {
    /// Build a directory and validate every record against the content
    /// region it points into.
    ///
    /// Fails on pending descriptors (never persisted), records shorter than
    /// their hash, records past the end of the content region, and repeated
    /// identifiers.
    pub fn from_header_checked(header: &[u8], content_len: usize) -> crate::Result<Self> {
        use crate::error::PackError;
        use crate::format::HASH_SIZE;

        let mut entries = HashMap::new();
        for (index, chunk) in header.chunks_exact(RECORD_SIZE).enumerate() {
            let HeaderRecord { id, descriptor } = HeaderRecord::decode(chunk);

            if descriptor.is_pending() {
                return Err(PackError::MalformedBuffer(format!(
                    "Record {} ({}) carries the pending sentinel",
                    index, id
                )));
            }
            if (descriptor.size() as usize) < HASH_SIZE {
                return Err(PackError::MalformedBuffer(format!(
                    "Record {} ({}) is {} bytes, shorter than its hash",
                    index,
                    id,
                    descriptor.size()
                )));
            }
            if descriptor.range().end > content_len {
                return Err(PackError::OutOfBounds {
                    offset: descriptor.offset(),
                    size: descriptor.size(),
                    len: content_len,
                });
            }
            if entries.insert(id, descriptor).is_some() {
                return Err(PackError::MalformedBuffer(format!(
                    "Identifier {} appears more than once",
                    id
                )));
            }
        }

        debug!(entries = entries.len(), content_len, "parsed and validated directory");
        Ok(Self { entries })
    }
}
