//! Lazy entries
//!
//! Entry views and the iterator over them. Nothing is decoded until a
//! value is asked for.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::directory::Directory;
use crate::error::Result;

use super::PackMap;

/// An `(id, value)` pair whose value is resolved through the map on demand
pub struct LazyEntry<'a, V> {
    map: &'a PackMap<V>,
    id: Uuid,
}

impl<'a, V> LazyEntry<'a, V> {
    pub(super) fn new(map: &'a PackMap<V>, id: Uuid) -> Self {
        Self { map, id }
    }

    pub fn key(&self) -> Uuid {
        self.id
    }

    /// Decode (or fetch from cache) the value
    pub fn value(&self) -> Result<Option<Arc<V>>> {
        self.map.get(&self.id)
    }

    /// Hash of the pair, read from the stored record hash when not cached
    pub fn hash(&self) -> Result<Option<u32>> {
        self.map.entry_hash(&self.id)
    }
}

impl<V> Clone for LazyEntry<'_, V> {
    fn clone(&self) -> Self {
        Self {
            map: self.map,
            id: self.id,
        }
    }
}

impl<V> fmt::Debug for LazyEntry<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyEntry").field("id", &self.id).finish()
    }
}

/// Iterator over lazy entries, in the directory order of the snapshot it
/// was created from
pub struct Iter<'a, V> {
    map: &'a PackMap<V>,
    ids: Box<dyn Iterator<Item = Uuid>>,
    remaining: usize,
}

impl<'a, V> Iter<'a, V> {
    pub(super) fn new(map: &'a PackMap<V>, directory: Directory) -> Self {
        let remaining = directory.len();
        Self {
            map,
            ids: Box::new(directory.into_ids()),
            remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = LazyEntry<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        self.remaining -= 1;
        Some(LazyEntry::new(self.map, id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
