//! Map Module
//!
//! The store facade: a UUID-keyed map over a packed buffer.
//!
//! ## Responsibilities
//! - Parse (or defer parsing of) a buffer into a directory
//! - Decode values on first read and memoize the result
//! - Derive new snapshots on `set`/`remove` without touching the receiver
//! - Compact pending edits into a fresh buffer on serialization
//!
//! ## Concurrency Model
//! `set`/`remove` look purely functional, but `get` fills the decode cache
//! and `compact` swaps the buffer on the receiving snapshot. That state sits
//! behind a `parking_lot::Mutex`, so a snapshot can be shared, and every
//! memo side effect is serialized. The codec runs while the lock is held and
//! must not call back into the same snapshot.
//!
//! Snapshots derived from a common ancestor share the ancestor's buffer by
//! reference until one of them compacts; compaction only replaces the
//! compacting snapshot's own views and never writes to the old bytes.

mod compactor;
mod entry;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::cache::{CacheEntry, DecodeCache};
use crate::codec::ValueCodec;
use crate::config::Config;
use crate::content::ContentView;
use crate::directory::Directory;
use crate::error::{PackError, Result};
use crate::format::{self, read_header_length, Descriptor, LENGTH_PREFIX_SIZE};

pub use entry::{Iter, LazyEntry};

/// Serialized form of an empty store: a zero header length
const EMPTY_BUFFER: &[u8] = &[0, 0, 0, 0];

// =============================================================================
// Snapshot State
// =============================================================================

/// Mutable memo state of one snapshot
struct Snapshot<V> {
    /// `None` until a lazily opened buffer is first accessed
    directory: Option<Directory>,
    cache: DecodeCache<V>,
    buffer: Bytes,
    header: Bytes,
    content: ContentView,
    /// Edits since the last compaction
    pending: usize,
    /// Memoized equivalent hash
    hash: Option<u32>,
}

impl<V> Clone for Snapshot<V> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            cache: self.cache.clone(),
            buffer: self.buffer.clone(),
            header: self.header.clone(),
            content: self.content.clone(),
            pending: self.pending,
            hash: self.hash,
        }
    }
}

impl<V> Snapshot<V> {
    fn empty() -> Self {
        Self {
            directory: Some(Directory::new()),
            cache: DecodeCache::new(),
            buffer: Bytes::from_static(EMPTY_BUFFER),
            header: Bytes::new(),
            content: ContentView::default(),
            pending: 0,
            hash: None,
        }
    }

    fn parse(buffer: Bytes, config: &Config) -> Result<Self> {
        let header_len = read_header_length(&buffer)?;
        let header_end = LENGTH_PREFIX_SIZE + header_len;
        let header = buffer.slice(LENGTH_PREFIX_SIZE..header_end);
        let content = buffer.slice(header_end..);

        if content.len() > u32::MAX as usize {
            return Err(PackError::MalformedBuffer(format!(
                "Content region of {} bytes exceeds 32-bit offsets",
                content.len()
            )));
        }

        let directory = if config.lazy_directory {
            None
        } else {
            Some(Directory::from_header_checked(&header, content.len())?)
        };

        debug!(
            buffer_bytes = buffer.len(),
            header_bytes = header_len,
            lazy = config.lazy_directory,
            "opened buffer"
        );

        Ok(Self {
            directory,
            cache: DecodeCache::new(),
            buffer,
            header,
            content: ContentView::new(content),
            pending: 0,
            hash: None,
        })
    }

    /// The directory, parsing the header on first use
    fn directory(&mut self) -> &Directory {
        let header = &self.header;
        self.directory
            .get_or_insert_with(|| Directory::from_header(header))
    }
}

// =============================================================================
// PackMap
// =============================================================================

/// A UUID-keyed map of lazily decoded values over a packed buffer
pub struct PackMap<V> {
    codec: Arc<dyn ValueCodec<V>>,
    config: Arc<Config>,
    state: Mutex<Snapshot<V>>,
}

/// Size and cache counters of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapStats {
    pub entries: usize,
    pub pending_edits: usize,
    pub cached_values: usize,
    pub header_bytes: usize,
    pub content_bytes: usize,
    pub buffer_bytes: usize,
}

impl<V> PackMap<V> {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create an empty store with the default config
    pub fn new<C: ValueCodec<V> + 'static>(codec: C) -> Self {
        Self::with_config(codec, Config::default())
    }

    /// Create an empty store
    pub fn with_config<C: ValueCodec<V> + 'static>(codec: C, config: Config) -> Self {
        Self::from_parts(Arc::new(codec), Arc::new(config), Snapshot::empty())
    }

    /// Open a serialized buffer with the default config
    pub fn from_bytes<C: ValueCodec<V> + 'static>(
        bytes: impl Into<Bytes>,
        codec: C,
    ) -> Result<Self> {
        Self::from_bytes_with_config(bytes, codec, Config::default())
    }

    /// Open a serialized buffer.
    ///
    /// The header length is always validated. With an eager config every
    /// directory record is checked against the content region as well.
    pub fn from_bytes_with_config<C: ValueCodec<V> + 'static>(
        bytes: impl Into<Bytes>,
        codec: C,
        config: Config,
    ) -> Result<Self> {
        Self::from_shared(bytes.into(), Arc::new(codec), Arc::new(config))
    }

    /// Open a serialized buffer with an already shared codec and config
    pub fn from_shared(
        bytes: Bytes,
        codec: Arc<dyn ValueCodec<V>>,
        config: Arc<Config>,
    ) -> Result<Self> {
        let snapshot = Snapshot::parse(bytes, &config)?;
        Ok(Self::from_parts(codec, config, snapshot))
    }

    /// Read a buffer from a file
    pub fn open<C: ValueCodec<V> + 'static>(
        path: &Path,
        codec: C,
        config: Config,
    ) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes_with_config(bytes, codec, config)
    }

    fn from_parts(codec: Arc<dyn ValueCodec<V>>, config: Arc<Config>, state: Snapshot<V>) -> Self {
        Self {
            codec,
            config,
            state: Mutex::new(state),
        }
    }

    /// New snapshot sharing this one's codec, config and byte views
    fn derive(&self, state: &Snapshot<V>, directory: Directory, cache: DecodeCache<V>, pending: usize) -> Self {
        Self::from_parts(
            Arc::clone(&self.codec),
            Arc::clone(&self.config),
            Snapshot {
                directory: Some(directory),
                cache,
                buffer: state.buffer.clone(),
                header: state.header.clone(),
                content: state.content.clone(),
                pending,
                hash: None,
            },
        )
    }

    /// Empty store sharing this store's codec and config
    pub fn cleared(&self) -> Self {
        Self::from_parts(
            Arc::clone(&self.codec),
            Arc::clone(&self.config),
            Snapshot::empty(),
        )
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a value by identifier.
    ///
    /// Search order:
    /// 1. Decode cache (including remembered misses)
    /// 2. Directory + content, decoding and caching the value
    ///
    /// A value is decoded at most once per snapshot.
    pub fn get(&self, id: &Uuid) -> Result<Option<Arc<V>>> {
        let mut state = self.state.lock();

        if let Some(entry) = state.cache.get(id) {
            return Ok(entry.value().cloned());
        }

        match state.directory().get(id) {
            Some(descriptor) => {
                trace!(%id, ?descriptor, "cache miss, decoding");
                let value = Arc::new(self.decode_record(id, descriptor, &state.content)?);
                state.cache = state
                    .cache
                    .insert(*id, CacheEntry::Decoded(Arc::clone(&value)));
                Ok(Some(value))
            }
            None => {
                trace!(%id, "cache miss, absent");
                state.cache = state.cache.insert(*id, CacheEntry::Absent);
                Ok(None)
            }
        }
    }

    /// Get a value, falling back to `default` when the identifier is absent
    pub fn get_or(&self, id: &Uuid, default: V) -> Result<Arc<V>> {
        Ok(self.get(id)?.unwrap_or_else(|| Arc::new(default)))
    }

    pub fn contains_key(&self, id: &Uuid) -> bool {
        self.state.lock().directory().contains(id)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.state.lock().directory().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazy entry view; the value is resolved on demand
    pub fn entry(&self, id: &Uuid) -> Option<LazyEntry<'_, V>> {
        if self.contains_key(id) {
            Some(LazyEntry::new(self, *id))
        } else {
            None
        }
    }

    /// Lazy entries in directory order.
    ///
    /// The order is fixed for this snapshot; calling `iter` again restarts
    /// the sequence.
    pub fn iter(&self) -> Iter<'_, V> {
        let directory = self.state.lock().directory().clone();
        Iter::new(self, directory)
    }

    /// Identifiers in directory order
    pub fn keys(&self) -> Vec<Uuid> {
        self.state.lock().directory().iter().map(|(id, _)| id).collect()
    }

    /// Hash of the value stored under `id`.
    ///
    /// Cached values are hashed with the codec; committed ones use the hash
    /// stored in front of their record, so no decode happens.
    pub fn value_hash(&self, id: &Uuid) -> Result<Option<u32>> {
        let mut state = self.state.lock();
        self.value_hash_locked(&mut state, id)
    }

    fn value_hash_locked(&self, state: &mut Snapshot<V>, id: &Uuid) -> Result<Option<u32>> {
        match state.cache.get(id) {
            Some(CacheEntry::Decoded(value)) => self
                .codec
                .hash(value)
                .map(Some)
                .map_err(|source| PackError::Encode { id: *id, source }),
            Some(CacheEntry::Absent) => Ok(None),
            None => match state.directory().get(id) {
                Some(descriptor) => {
                    let descriptor = self.committed(id, descriptor)?;
                    state.content.stored_hash(descriptor).map(Some)
                }
                None => Ok(None),
            },
        }
    }

    /// Hash of the `(id, value)` pair, or `None` if `id` is absent
    pub fn entry_hash(&self, id: &Uuid) -> Result<Option<u32>> {
        Ok(self
            .value_hash(id)?
            .map(|value_hash| format::entry_hash(id, value_hash)))
    }

    /// Order-independent hash of all entries.
    ///
    /// Equal for snapshots with the same logical contents regardless of
    /// layout. Memoized on the snapshot.
    pub fn equivalent_hash(&self) -> Result<u32> {
        let mut state = self.state.lock();
        if let Some(hash) = state.hash {
            return Ok(hash);
        }

        let ids: Vec<Uuid> = state.directory().iter().map(|(id, _)| id).collect();
        let mut hashes = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(value_hash) = self.value_hash_locked(&mut state, id)? {
                hashes.push(format::entry_hash(id, value_hash));
            }
        }

        let hash = format::unordered_hash(hashes);
        state.hash = Some(hash);
        Ok(hash)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// New snapshot with `id` mapped to `value`.
    ///
    /// The value stays in the cache until the next compaction encodes it.
    pub fn set(&self, id: Uuid, value: V) -> Self {
        let mut state = self.state.lock();
        let directory = state.directory().insert(id, Descriptor::PENDING);
        let cache = state.cache.insert(id, CacheEntry::Decoded(Arc::new(value)));
        self.derive(&state, directory, cache, state.pending + 1)
    }

    /// Set from an `(id, value)` pair
    pub fn set_entry(&self, (id, value): (Uuid, V)) -> Self {
        self.set(id, value)
    }

    /// Set every pair, in order
    pub fn set_all(&self, entries: impl IntoIterator<Item = (Uuid, V)>) -> Self {
        let mut iter = entries.into_iter();
        let Some(first) = iter.next() else {
            return self.clone();
        };
        iter.fold(self.set_entry(first), |map, entry| map.set_entry(entry))
    }

    /// Not supported; always fails
    pub fn insert_if_absent(&self, _id: Uuid, _value: V) -> Result<Self> {
        Err(PackError::Unsupported("insert_if_absent"))
    }

    /// New snapshot without `id`.
    ///
    /// Removing an absent identifier still counts as an edit.
    pub fn remove(&self, id: &Uuid) -> Self {
        let mut state = self.state.lock();
        let directory = state.directory().remove(id);
        let cache = state.cache.remove(id);
        self.derive(&state, directory, cache, state.pending + 1)
    }

    /// New snapshot in which every entry is pending.
    ///
    /// All values are decoded into the cache, so the next compaction
    /// re-encodes everything with the current codec.
    pub fn force_modified(&self) -> Result<Self> {
        let mut state = self.state.lock();
        let directory = state.directory().clone();

        let mut pending_dir = directory.clone();
        let mut cache = state.cache.clone();

        for (id, descriptor) in directory.iter() {
            let cached = state.cache.get(&id).and_then(|e| e.value()).cloned();
            let value = match cached {
                Some(value) => value,
                None => {
                    let descriptor = self.committed(&id, descriptor)?;
                    Arc::new(self.decode_record(&id, descriptor, &state.content)?)
                }
            };
            cache = cache.insert(id, CacheEntry::Decoded(value));
            pending_dir = pending_dir.insert(id, Descriptor::PENDING);
        }

        debug!(entries = directory.len(), "forced all entries pending");
        let pending = (state.pending + directory.len()).max(1);
        Ok(self.derive(&state, pending_dir, cache, pending))
    }

    // =========================================================================
    // Compaction & Serialization
    // =========================================================================

    /// Rewrite the buffer so it reflects every pending edit.
    ///
    /// No-op when nothing is pending. On failure the current buffer stays
    /// installed and valid.
    pub fn compact(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.pending == 0 {
            return Ok(());
        }

        let directory = state.directory().clone();
        let compacted = compactor::compact(
            &directory,
            &state.cache,
            &state.content,
            self.codec.as_ref(),
            self.config.max_content_size,
        )?;

        state.directory = Some(compacted.directory);
        state.buffer = compacted.buffer;
        state.header = compacted.header;
        state.content = compacted.content;
        state.pending = 0;
        Ok(())
    }

    /// Compact, then return the serialized buffer
    pub fn to_bytes(&self) -> Result<Bytes> {
        self.compact()?;
        Ok(self.state.lock().buffer.clone())
    }

    /// Compact and write the serialized buffer to a file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)?;
        Ok(())
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Number of edits since the last compaction
    pub fn pending_edits(&self) -> usize {
        self.state.lock().pending
    }

    /// Whether a decoded value for `id` is cached
    pub fn is_cached(&self, id: &Uuid) -> bool {
        matches!(self.state.lock().cache.get(id), Some(CacheEntry::Decoded(_)))
    }

    /// Descriptor currently recorded for `id`
    pub fn descriptor(&self, id: &Uuid) -> Option<Descriptor> {
        self.state.lock().directory().get(id)
    }

    pub fn stats(&self) -> MapStats {
        let mut state = self.state.lock();
        let entries = state.directory().len();
        MapStats {
            entries,
            pending_edits: state.pending,
            cached_values: state.cache.decoded_len(),
            header_bytes: state.header.len(),
            content_bytes: state.content.len(),
            buffer_bytes: state.buffer.len(),
        }
    }

    /// Check committed records against the content region.
    ///
    /// Records must be in bounds and must not overlap. Once nothing is
    /// pending they must also tile the region exactly, with no gaps.
    pub fn verify(&self) -> Result<()> {
        let mut state = self.state.lock();
        let content_len = state.content.len();
        let pending = state.pending;

        let mut committed: Vec<(Uuid, Descriptor)> = state
            .directory()
            .iter()
            .filter(|(_, d)| !d.is_pending())
            .collect();
        committed.sort_by_key(|(_, d)| d.offset());

        let mut cursor = 0usize;
        for (id, descriptor) in committed {
            state.content.record(descriptor)?;
            let range = descriptor.range();
            if range.start < cursor {
                return Err(PackError::MalformedBuffer(format!(
                    "Record {} at offset {} overlaps the previous record ending at {}",
                    id, range.start, cursor
                )));
            }
            if pending == 0 && range.start > cursor {
                return Err(PackError::MalformedBuffer(format!(
                    "Gap of {} bytes before record {} at offset {}",
                    range.start - cursor,
                    id,
                    range.start
                )));
            }
            cursor = range.end;
        }

        if pending == 0 && cursor != content_len {
            return Err(PackError::MalformedBuffer(format!(
                "Records cover {} of {} content bytes",
                cursor, content_len
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Reject a pending descriptor where a committed record is required
    fn committed(&self, id: &Uuid, descriptor: Descriptor) -> Result<Descriptor> {
        if descriptor.is_pending() {
            return Err(PackError::MalformedBuffer(format!(
                "Pending entry {} has no cached value",
                id
            )));
        }
        Ok(descriptor)
    }

    fn decode_record(&self, id: &Uuid, descriptor: Descriptor, content: &ContentView) -> Result<V> {
        let descriptor = self.committed(id, descriptor)?;
        let payload = content.payload(descriptor)?;
        let value = self
            .codec
            .decode(&payload)
            .map_err(|source| PackError::Decode { id: *id, source })?;

        if self.config.verify_hashes {
            let stored = content.stored_hash(descriptor)?;
            let computed = self
                .codec
                .hash(&value)
                .map_err(|source| PackError::Decode { id: *id, source })?;
            if stored != computed {
                return Err(PackError::MalformedBuffer(format!(
                    "Hash mismatch for {}: stored {:08x}, computed {:08x}",
                    id, stored, computed
                )));
            }
        }

        Ok(value)
    }
}

impl<V: PartialEq> PackMap<V> {
    /// Structural equality: same identifiers mapped to equal values.
    ///
    /// Compares counts and equivalent hashes before decoding anything.
    pub fn equivalent(&self, other: &PackMap<V>) -> Result<bool> {
        if std::ptr::eq(self, other) {
            return Ok(true);
        }
        if self.len() != other.len() {
            return Ok(false);
        }
        if self.equivalent_hash()? != other.equivalent_hash()? {
            return Ok(false);
        }
        for id in self.keys() {
            match (self.get(&id)?, other.get(&id)?) {
                (Some(a), Some(b)) if a == b => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

impl<V: PartialEq> PartialEq for PackMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.equivalent(other).unwrap_or(false)
    }
}

impl<V> Clone for PackMap<V> {
    fn clone(&self) -> Self {
        let state = self.state.lock().clone();
        Self::from_parts(Arc::clone(&self.codec), Arc::clone(&self.config), state)
    }
}

impl<V> fmt::Debug for PackMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("PackMap")
            .field("entries", &stats.entries)
            .field("pending_edits", &stats.pending_edits)
            .field("buffer_bytes", &stats.buffer_bytes)
            .finish()
    }
}

impl<'a, V> IntoIterator for &'a PackMap<V> {
    type Item = LazyEntry<'a, V>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
