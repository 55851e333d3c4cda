//! Tests for the PackMap facade
//!
//! These tests verify:
//! - Basic get/set/remove and snapshot persistence
//! - At-most-once decoding and negative lookup memoization
//! - Lazy entries and iteration
//! - Order-independent hashing and structural equality
//! - Lazy directory parsing and hash verification

mod common;

use std::collections::HashSet;

use common::CountingCodec;
use packmap::{Config, PackError, PackMap, Utf8Codec};
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

fn ids(count: usize) -> Vec<Uuid> {
    (0..count).map(|_| Uuid::new_v4()).collect()
}

/// Serialize `count` entries valued "value{i}" and return their bytes
fn packed(ids: &[Uuid]) -> bytes::Bytes {
    PackMap::new(Utf8Codec)
        .set_all(ids.iter().enumerate().map(|(i, id)| (*id, format!("value{}", i))))
        .to_bytes()
        .unwrap()
}

fn value_of(map: &PackMap<String>, id: &Uuid) -> Option<String> {
    map.get(id).unwrap().map(|v| v.as_str().to_string())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_map_is_empty() {
    let map = PackMap::new(Utf8Codec);
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
    assert_eq!(map.pending_edits(), 0);
    assert_eq!(&map.to_bytes().unwrap()[..], &[0, 0, 0, 0]);
}

#[test]
fn test_set_and_get() {
    let id = Uuid::new_v4();
    let map = PackMap::new(Utf8Codec).set(id, "hello".to_string());

    assert_eq!(value_of(&map, &id), Some("hello".to_string()));
    assert!(map.contains_key(&id));
    assert_eq!(map.len(), 1);
    assert_eq!(map.pending_edits(), 1);
    assert!(map.descriptor(&id).unwrap().is_pending());
}

#[test]
fn test_set_overwrites_existing() {
    let id = Uuid::new_v4();
    let map = PackMap::new(Utf8Codec)
        .set(id, "first".to_string())
        .set(id, "second".to_string());

    assert_eq!(map.len(), 1);
    assert_eq!(value_of(&map, &id), Some("second".to_string()));
}

#[test]
fn test_set_leaves_receiver_untouched() {
    let id = Uuid::new_v4();
    let base = PackMap::new(Utf8Codec);
    let derived = base.set(id, "x".to_string());

    assert!(!base.contains_key(&id));
    assert_eq!(base.len(), 0);
    assert_eq!(derived.len(), 1);
}

#[test]
fn test_remove_entry() {
    let [a, b] = [Uuid::new_v4(), Uuid::new_v4()];
    let map = PackMap::new(Utf8Codec)
        .set(a, "A".to_string())
        .set(b, "B".to_string());
    let removed = map.remove(&a);

    assert_eq!(removed.len(), 1);
    assert_eq!(value_of(&removed, &a), None);
    assert_eq!(value_of(&removed, &b), Some("B".to_string()));
    assert_eq!(value_of(&map, &a), Some("A".to_string()));
}

#[test]
fn test_remove_absent_still_counts_as_edit() {
    let map = PackMap::new(Utf8Codec);
    let removed = map.remove(&Uuid::new_v4());
    assert_eq!(removed.len(), 0);
    assert_eq!(removed.pending_edits(), 1);
}

#[test]
fn test_get_or_default() {
    let id = Uuid::new_v4();
    let map = PackMap::new(Utf8Codec).set(id, "present".to_string());

    assert_eq!(*map.get_or(&id, "fallback".to_string()).unwrap(), "present");
    assert_eq!(
        *map.get_or(&Uuid::new_v4(), "fallback".to_string()).unwrap(),
        "fallback"
    );
}

#[test]
fn test_insert_if_absent_is_unsupported() {
    let map = PackMap::new(Utf8Codec);
    let err = map.insert_if_absent(Uuid::new_v4(), "x".to_string()).unwrap_err();
    assert!(matches!(err, PackError::Unsupported(_)));
}

#[test]
fn test_cleared_keeps_codec() {
    let id = Uuid::new_v4();
    let map = PackMap::new(Utf8Codec).set(id, "x".to_string());
    let empty = map.cleared();

    assert!(empty.is_empty());
    assert_eq!(empty.pending_edits(), 0);
    assert_eq!(value_of(&empty.set(id, "y".to_string()), &id), Some("y".to_string()));
}

// =============================================================================
// Decode Cache Tests
// =============================================================================

#[test]
fn test_decode_at_most_once() {
    let ids = ids(5);
    let codec = CountingCodec::default();
    let map = PackMap::from_bytes(packed(&ids), codec.clone()).unwrap();

    for _ in 0..3 {
        for id in &ids {
            map.get(id).unwrap();
        }
    }

    assert_eq!(codec.decodes(), ids.len());
}

#[test]
fn test_unread_entries_are_never_decoded() {
    let ids = ids(10);
    let codec = CountingCodec::default();
    let map = PackMap::from_bytes(packed(&ids), codec.clone()).unwrap();

    assert_eq!(map.len(), 10);
    map.get(&ids[3]).unwrap();

    assert_eq!(codec.decodes(), 1);
    assert!(map.is_cached(&ids[3]));
    assert!(!map.is_cached(&ids[4]));
}

#[test]
fn test_negative_lookup_is_memoized() {
    let ids = ids(3);
    let codec = CountingCodec::default();
    let map = PackMap::from_bytes(packed(&ids), codec.clone()).unwrap();
    let missing = Uuid::new_v4();

    for _ in 0..5 {
        assert!(map.get(&missing).unwrap().is_none());
    }

    assert_eq!(codec.decodes(), 0);
    assert_eq!(map.len(), 3);
    assert!(!map.contains_key(&missing));
    assert!(map.entry(&missing).is_none());
}

#[test]
fn test_set_after_negative_lookup() {
    let id = Uuid::new_v4();
    let map = PackMap::new(Utf8Codec);
    assert!(map.get(&id).unwrap().is_none());

    let updated = map.set(id, "now".to_string());
    assert_eq!(value_of(&updated, &id), Some("now".to_string()));
    assert!(map.get(&id).unwrap().is_none());
}

#[test]
fn test_derived_snapshot_inherits_cache() {
    let ids = ids(2);
    let codec = CountingCodec::default();
    let map = PackMap::from_bytes(packed(&ids), codec.clone()).unwrap();

    map.get(&ids[0]).unwrap();
    let derived = map.set(Uuid::new_v4(), "new".to_string());
    derived.get(&ids[0]).unwrap();

    assert_eq!(codec.decodes(), 1);
}

#[test]
fn test_decode_failure_leaves_cache_untouched() {
    let id = Uuid::new_v4();
    let bytes = PackMap::new(packmap::RawCodec)
        .set(id, bytes::Bytes::from_static(&[0xff, 0xfe]))
        .to_bytes()
        .unwrap();
    let map = PackMap::from_bytes(bytes, Utf8Codec).unwrap();

    let err = map.get(&id).unwrap_err();
    assert!(matches!(err, PackError::Decode { id: failed, .. } if failed == id));
    assert!(!map.is_cached(&id));
    assert!(map.get(&id).is_err());
}

// =============================================================================
// Entry & Iteration Tests
// =============================================================================

#[test]
fn test_iter_visits_every_entry_once() {
    let ids = ids(20);
    let map = PackMap::from_bytes(packed(&ids), Utf8Codec).unwrap();

    let seen: HashSet<Uuid> = map.iter().map(|e| e.key()).collect();
    assert_eq!(seen, ids.iter().copied().collect());
    assert_eq!(map.iter().len(), 20);
}

#[test]
fn test_iter_is_restartable_and_stable() {
    let ids = ids(20);
    let map = PackMap::from_bytes(packed(&ids), Utf8Codec).unwrap();

    let first: Vec<Uuid> = map.iter().map(|e| e.key()).collect();
    let second: Vec<Uuid> = (&map).into_iter().map(|e| e.key()).collect();
    assert_eq!(first, second);
    assert_eq!(first, map.keys());
}

#[test]
fn test_iter_values_are_lazy() {
    let ids = ids(4);
    let codec = CountingCodec::default();
    let map = PackMap::from_bytes(packed(&ids), codec.clone()).unwrap();

    let entries: Vec<_> = map.iter().collect();
    assert_eq!(codec.decodes(), 0);

    let value = entries[0].value().unwrap().unwrap();
    assert!(value.starts_with("value"));
    assert_eq!(codec.decodes(), 1);
}

#[test]
fn test_entry_hash_reads_stored_hash_without_decoding() {
    let ids = ids(3);
    let codec = CountingCodec::default();
    let map = PackMap::from_bytes(packed(&ids), codec.clone()).unwrap();

    let entry = map.entry(&ids[1]).unwrap();
    let stored = entry.hash().unwrap().unwrap();
    assert_eq!(codec.decodes(), 0);

    entry.value().unwrap();
    assert_eq!(map.entry_hash(&ids[1]).unwrap().unwrap(), stored);
}

// =============================================================================
// Hashing & Equality Tests
// =============================================================================

#[test]
fn test_equivalent_hash_ignores_order_and_layout() {
    let [a, b, c] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let forward = PackMap::new(Utf8Codec)
        .set(a, "A".to_string())
        .set(b, "B".to_string())
        .set(c, "C".to_string());
    let backward = PackMap::new(Utf8Codec)
        .set(c, "C".to_string())
        .set(b, "B".to_string())
        .set(a, "A".to_string());
    let reopened = PackMap::from_bytes(forward.to_bytes().unwrap(), Utf8Codec).unwrap();

    let hash = forward.equivalent_hash().unwrap();
    assert_eq!(backward.equivalent_hash().unwrap(), hash);
    assert_eq!(reopened.equivalent_hash().unwrap(), hash);
}

#[test]
fn test_equivalent_hash_differs_on_value_change() {
    let id = Uuid::new_v4();
    let one = PackMap::new(Utf8Codec).set(id, "one".to_string());
    let two = one.set(id, "two".to_string());
    assert_ne!(one.equivalent_hash().unwrap(), two.equivalent_hash().unwrap());
}

#[test]
fn test_structural_equality() {
    let [a, b] = [Uuid::new_v4(), Uuid::new_v4()];
    let left = PackMap::new(Utf8Codec)
        .set(a, "A".to_string())
        .set(b, "B".to_string());
    let right = PackMap::from_bytes(
        PackMap::new(Utf8Codec)
            .set(b, "B".to_string())
            .set(a, "A".to_string())
            .to_bytes()
            .unwrap(),
        Utf8Codec,
    )
    .unwrap();

    assert_eq!(left, right);
    assert_ne!(left, right.remove(&a));
    assert_ne!(left, right.set(a, "changed".to_string()));
    assert!(left.equivalent(&left).unwrap());
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_lazy_directory_parses_on_first_access() {
    let ids = ids(6);
    let config = Config::builder().lazy_directory(true).build();
    let map = PackMap::from_bytes_with_config(packed(&ids), Utf8Codec, config).unwrap();

    assert_eq!(map.len(), 6);
    assert_eq!(value_of(&map, &ids[5]), Some("value5".to_string()));
}

#[test]
fn test_lazy_directory_still_validates_header_length() {
    let config = Config::builder().lazy_directory(true).build();
    let result = PackMap::from_bytes_with_config(vec![0u8, 0, 0, 24], Utf8Codec, config);
    assert!(matches!(result, Err(PackError::MalformedBuffer(_))));
}

#[test]
fn test_verify_hashes_detects_tampering() {
    let id = Uuid::new_v4();
    let mut bytes = PackMap::new(Utf8Codec)
        .set(id, "payload".to_string())
        .to_bytes()
        .unwrap()
        .to_vec();
    // last byte of the payload
    let last = bytes.len() - 1;
    bytes[last] = b'X';

    let relaxed = PackMap::from_bytes(bytes.clone(), Utf8Codec).unwrap();
    assert_eq!(value_of(&relaxed, &id), Some("payloaX".to_string()));

    let config = Config::builder().verify_hashes(true).build();
    let strict = PackMap::from_bytes_with_config(bytes, Utf8Codec, config).unwrap();
    assert!(matches!(strict.get(&id), Err(PackError::MalformedBuffer(_))));
}

// =============================================================================
// Lazy Corruption Tests
// =============================================================================

/// One-entry buffer valued "payload"; descriptor sits at bytes 20..28
fn single_entry(id: Uuid) -> Vec<u8> {
    PackMap::new(Utf8Codec)
        .set(id, "payload".to_string())
        .to_bytes()
        .unwrap()
        .to_vec()
}

fn open_lazy(bytes: Vec<u8>) -> PackMap<String> {
    let config = Config::builder().lazy_directory(true).build();
    PackMap::from_bytes_with_config(bytes, Utf8Codec, config).unwrap()
}

#[test]
fn test_lazy_short_record_fails_every_read() {
    let id = Uuid::new_v4();
    let mut bytes = single_entry(id);
    // size field shorter than the stored hash
    bytes[20..24].copy_from_slice(&2u32.to_be_bytes());
    let map = open_lazy(bytes);

    assert!(matches!(map.get(&id), Err(PackError::MalformedBuffer(_))));
    assert!(matches!(map.value_hash(&id), Err(PackError::MalformedBuffer(_))));
    assert!(matches!(map.entry_hash(&id), Err(PackError::MalformedBuffer(_))));
    assert!(matches!(map.equivalent_hash(), Err(PackError::MalformedBuffer(_))));
}

#[test]
fn test_lazy_truncated_content_is_out_of_bounds() {
    let id = Uuid::new_v4();
    let mut bytes = single_entry(id);
    bytes.truncate(bytes.len() - 2);
    let map = open_lazy(bytes);

    assert!(matches!(
        map.get(&id),
        Err(PackError::OutOfBounds { offset: 0, size: 11, len: 9 })
    ));
    assert!(matches!(map.value_hash(&id), Err(PackError::OutOfBounds { .. })));

    let edited = map.set(Uuid::new_v4(), "other".to_string());
    let err = edited.compact().unwrap_err();
    assert!(matches!(err, PackError::OutOfBounds { .. }));
    assert_eq!(edited.pending_edits(), 1);
    assert_eq!(edited.stats().buffer_bytes, map.stats().buffer_bytes);
}

#[test]
fn test_lazy_repeated_identifier_keeps_last() {
    let id = Uuid::new_v4();
    let mut bytes = single_entry(id);
    // duplicate the header record, pointing both at the same content
    let record = bytes[4..28].to_vec();
    bytes.splice(28..28, record);
    bytes[0..4].copy_from_slice(&48u32.to_be_bytes());

    assert!(matches!(
        PackMap::from_bytes(bytes.clone(), Utf8Codec),
        Err(PackError::MalformedBuffer(_))
    ));

    let map = open_lazy(bytes);
    assert_eq!(map.len(), 1);
    assert_eq!(value_of(&map, &id), Some("payload".to_string()));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_shared_snapshot_concurrent_reads() {
    let ids = ids(50);
    let codec = CountingCodec::default();
    let map = std::sync::Arc::new(PackMap::from_bytes(packed(&ids), codec.clone()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let map = std::sync::Arc::clone(&map);
            let ids = ids.clone();
            std::thread::spawn(move || {
                for id in &ids {
                    assert!(map.get(id).unwrap().is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(codec.decodes(), 50);
}
