//! Order-independent hashing
//!
//! Per-entry hashes mix the identifier with the value hash; the map hash sums
//! them so that neither insertion order nor physical layout matters.

use uuid::Uuid;

/// Hash of a single `(identifier, value hash)` pair
pub fn entry_hash(id: &Uuid, value_hash: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(id.as_bytes());
    hasher.update(&value_hash.to_be_bytes());
    hasher.finalize()
}

/// Combine entry hashes regardless of their order
pub fn unordered_hash(entry_hashes: impl IntoIterator<Item = u32>) -> u32 {
    let mut sum = 0u32;
    let mut count = 0u32;
    for h in entry_hashes {
        sum = sum.wrapping_add(h);
        count = count.wrapping_add(1);
    }
    fmix32(sum ^ count)
}

// murmur3 finalizer
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
