//! Cache Module
//!
//! Per-snapshot memo of decoded values and known-absent identifiers.
//!
//! Shares the directory's persistence model: `insert`/`remove` return a new
//! cache and never disturb older versions.

use std::sync::Arc;

use im::HashMap;
use uuid::Uuid;

/// Memoized outcome of a lookup
#[derive(Debug)]
pub enum CacheEntry<V> {
    /// Value decoded from the buffer, or set but not yet compacted
    Decoded(Arc<V>),

    /// Lookup miss, remembered so it is not repeated
    Absent,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        match self {
            CacheEntry::Decoded(v) => CacheEntry::Decoded(Arc::clone(v)),
            CacheEntry::Absent => CacheEntry::Absent,
        }
    }
}

impl<V> CacheEntry<V> {
    /// The decoded value, if any
    pub fn value(&self) -> Option<&Arc<V>> {
        match self {
            CacheEntry::Decoded(v) => Some(v),
            CacheEntry::Absent => None,
        }
    }
}

/// Persistent identifier → cache entry map
#[derive(Debug)]
pub struct DecodeCache<V> {
    entries: HashMap<Uuid, CacheEntry<V>>,
}

impl<V> Clone for DecodeCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V> Default for DecodeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> DecodeCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&CacheEntry<V>> {
        self.entries.get(id)
    }

    /// New cache with `id` mapped to `entry`
    pub fn insert(&self, id: Uuid, entry: CacheEntry<V>) -> Self {
        Self {
            entries: self.entries.update(id, entry),
        }
    }

    /// New cache without `id`
    pub fn remove(&self, id: &Uuid) -> Self {
        Self {
            entries: self.entries.without(id),
        }
    }

    /// Number of cached values (negative lookups excluded)
    pub fn decoded_len(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, CacheEntry::Decoded(_)))
            .count()
    }
}
