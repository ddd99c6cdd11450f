//! VersionedKey Tests
//!
//! Tests verify:
//! - Ordering (row ASC, column ASC, timestamp DESC)
//! - Row/column validation
//! - Family/qualifier split
//! - Binary encoding boundary

use bytes::Bytes;
use hmemcache::key::{VersionedKey, LATEST_TIMESTAMP};
use hmemcache::MemcacheError;

fn key(row: &str, column: &str, timestamp: u64) -> VersionedKey {
    VersionedKey::new(row.to_string(), column.to_string(), timestamp).unwrap()
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_rows_sort_ascending() {
    assert!(key("a", "f:q", 1) < key("b", "f:q", 1));
    assert!(key("row1", "f:q", 1) < key("row10", "f:q", 1));
    assert!(key("row10", "f:q", 1) < key("row2", "f:q", 1));
}

#[test]
fn test_columns_sort_ascending_within_row() {
    assert!(key("row", "f:a", 1) < key("row", "f:b", 100));
    assert!(key("row", "a:z", 1) < key("row", "b:a", 1));
}

#[test]
fn test_timestamps_sort_descending_within_column() {
    assert!(key("row", "f:q", 20) < key("row", "f:q", 10));
    assert!(key("row", "f:q", LATEST_TIMESTAMP) < key("row", "f:q", 0));
}

#[test]
fn test_sorted_enumeration_order() {
    let mut keys = vec![
        key("row2", "info:a", 10),
        key("row1", "info:b", 50),
        key("row1", "info:a", 20),
        key("row1", "info:a", 30),
    ];
    keys.sort();

    assert_eq!(
        keys,
        vec![
            key("row1", "info:a", 30),
            key("row1", "info:a", 20),
            key("row1", "info:b", 50),
            key("row2", "info:a", 10),
        ]
    );
}

#[test]
fn test_equal_keys() {
    assert_eq!(key("row", "f:q", 7), key("row", "f:q", 7));
    assert_ne!(key("row", "f:q", 7), key("row", "f:q", 8));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_empty_row_rejected() {
    let result = VersionedKey::new("", "f:q", 1);
    assert!(matches!(result, Err(MemcacheError::InvalidKey(_))));
}

#[test]
fn test_column_without_delimiter_rejected() {
    let result = VersionedKey::new("row", "noqualifier", 1);
    assert!(matches!(result, Err(MemcacheError::InvalidKey(_))));
}

#[test]
fn test_column_with_empty_family_rejected() {
    let result = VersionedKey::new("row", ":qualifier", 1);
    assert!(matches!(result, Err(MemcacheError::InvalidKey(_))));
}

#[test]
fn test_empty_qualifier_allowed() {
    let k = VersionedKey::latest("row", "family:").unwrap();
    assert_eq!(k.family(), b"family");
    assert_eq!(k.qualifier(), b"");
    assert_eq!(k.timestamp(), LATEST_TIMESTAMP);
}

#[test]
fn test_family_and_qualifier() {
    let k = key("row", "info:name:first", 1);
    assert_eq!(k.family(), b"info");
    assert_eq!(k.qualifier(), b"name:first");
}

#[test]
fn test_matches_row_column_and_with_timestamp() {
    let k = key("row", "f:q", 1);
    let newer = k.with_timestamp(99);

    assert!(k.matches_row_column(&newer));
    assert_eq!(newer.timestamp(), 99);
    assert!(!k.matches_row_column(&key("row", "f:other", 1)));
}

#[test]
fn test_heap_size() {
    let k = key("row", "f:q", 1);
    assert_eq!(k.heap_size(), 3 + 3 + 8);
}

#[test]
fn test_display() {
    assert_eq!(key("row", "f:q", 42).to_string(), "row/f:q/42");
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_decode() {
    let k = key("row-1", "info:a", 1234);

    let encoded = k.encode().unwrap();
    let decoded = VersionedKey::decode(&encoded).unwrap();

    assert_eq!(decoded, k);
}

#[test]
fn test_decode_truncated_input() {
    let encoded = key("row-1", "info:a", 1234).encode().unwrap();

    let result = VersionedKey::decode(&encoded[..encoded.len() - 3]);
    assert!(matches!(result, Err(MemcacheError::Serialization(_))));
}

#[test]
fn test_decode_garbage() {
    let result = VersionedKey::decode(&[1, 2, 3]);
    assert!(matches!(result, Err(MemcacheError::Serialization(_))));
}

#[test]
fn test_decode_rejects_invalid_column() {
    // Same layout as a key, but the column has no family delimiter
    let bytes = bincode::serialize(&(Bytes::from("row"), Bytes::from("nocolon"), 5u64)).unwrap();

    let result = VersionedKey::decode(&bytes);
    assert!(matches!(result, Err(MemcacheError::InvalidKey(_))));
}
