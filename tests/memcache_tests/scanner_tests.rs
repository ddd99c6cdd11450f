//! Memcache Scanner Tests
//!
//! Tests verify:
//! - Rows come back in order with their newest visible values
//! - Start row, column selection and timestamp ceiling
//! - Rows without surviving columns are skipped
//! - Scanners read across the active and snapshot generations

use bytes::Bytes;
use hmemcache::key::{VersionedKey, LATEST_TIMESTAMP};
use hmemcache::memcache::{ColumnSet, Memcache, RowResult};

const ROW_COUNT: usize = 3;
const COLUMNS_COUNT: usize = 3;

// =============================================================================
// Helper Functions
// =============================================================================

fn key(row: &str, column: &str, timestamp: u64) -> VersionedKey {
    VersionedKey::new(row.to_string(), column.to_string(), timestamp).unwrap()
}

fn row_name(index: usize) -> String {
    format!("row{}", index)
}

fn column_name(row: usize, column: usize) -> String {
    format!("column:{};{}", row, column)
}

fn add_rows(memcache: &Memcache, timestamp: u64) {
    for i in 0..ROW_COUNT {
        for ii in 0..COLUMNS_COUNT {
            let column = column_name(i, ii);
            memcache.put(key(&row_name(i), &column, timestamp), column.clone());
        }
    }
}

fn rows_of(results: &[RowResult]) -> Vec<Bytes> {
    results.iter().map(|r| r.row.clone()).collect()
}

// =============================================================================
// Scanner Tests
// =============================================================================

#[test]
fn test_scanner() {
    let memcache = Memcache::new();
    add_rows(&memcache, 1);

    let mut scanner = memcache.get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"");
    assert!(scanner.is_wildcard());

    let mut count = 0;
    for (i, result) in scanner.by_ref().enumerate() {
        assert_eq!(result.row, Bytes::from(row_name(i)));
        assert_eq!(result.cells.len(), COLUMNS_COUNT);
        for ii in 0..COLUMNS_COUNT {
            let column = column_name(i, ii);
            assert_eq!(
                result.cells.get(column.as_bytes()),
                Some(&Bytes::from(column.clone()))
            );
        }
        count += 1;
    }

    assert_eq!(count, ROW_COUNT);
    assert!(scanner.next().is_none());
}

#[test]
fn test_scanner_from_each_start_row() {
    let memcache = Memcache::new();
    add_rows(&memcache, 1);

    for start in 0..ROW_COUNT {
        let scanner = memcache.get_scanner(
            LATEST_TIMESTAMP,
            ColumnSet::all(),
            row_name(start).as_bytes(),
        );
        let results: Vec<RowResult> = scanner.collect();

        let expected: Vec<Bytes> = (start..ROW_COUNT).map(|i| Bytes::from(row_name(i))).collect();
        assert_eq!(rows_of(&results), expected);
    }
}

#[test]
fn test_scanner_start_row_between_rows() {
    let memcache = Memcache::new();

    memcache.put(key("a", "f:q", 1), "a");
    memcache.put(key("c", "f:q", 1), "c");
    memcache.put(key("e", "f:q", 1), "e");

    let results: Vec<RowResult> = memcache
        .get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"b")
        .collect();

    assert_eq!(rows_of(&results), vec![Bytes::from("c"), Bytes::from("e")]);
}

#[test]
fn test_scanner_start_row_past_end() {
    let memcache = Memcache::new();
    add_rows(&memcache, 1);

    let mut scanner = memcache.get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"zzz");
    assert!(scanner.next().is_none());
}

#[test]
fn test_scanner_empty_memcache() {
    let memcache = Memcache::new();

    let mut scanner = memcache.get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"");
    assert!(scanner.next().is_none());
}

#[test]
fn test_scanner_skips_rows_without_surviving_columns() {
    let memcache = Memcache::new();

    memcache.put(key("a", "f:q", 1), "a");
    memcache.put(key("b", "f:q", 1), "b");
    memcache.delete(key("b", "f:q", 2));
    memcache.put(key("c", "other:q", 1), "c");
    memcache.put(key("d", "f:q", 1), "d");

    let results: Vec<RowResult> = memcache
        .get_scanner(LATEST_TIMESTAMP, ColumnSet::new(["f:"]), b"")
        .collect();

    // b is deleted, c has nothing in family f
    assert_eq!(rows_of(&results), vec![Bytes::from("a"), Bytes::from("d")]);
}

#[test]
fn test_scanner_column_selection() {
    let memcache = Memcache::new();
    add_rows(&memcache, 1);

    let wanted = column_name(1, 2);
    let mut scanner = memcache.get_scanner(LATEST_TIMESTAMP, ColumnSet::new([wanted.clone()]), b"");
    assert!(!scanner.is_wildcard());

    let result = scanner.next().unwrap();
    assert_eq!(result.row, Bytes::from(row_name(1)));
    assert_eq!(result.cells.len(), 1);
    assert_eq!(result.cells.get(wanted.as_bytes()), Some(&Bytes::from(wanted.clone())));

    assert!(scanner.next().is_none());
}

#[test]
fn test_scanner_timestamp_ceiling() {
    let memcache = Memcache::new();

    memcache.put(key("row", "f:a", 10), "ten");
    memcache.put(key("row", "f:a", 20), "twenty");
    memcache.put(key("late", "f:a", 30), "thirty");

    let results: Vec<RowResult> = memcache
        .get_scanner(15, ColumnSet::all(), b"")
        .collect();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].row, Bytes::from("row"));
    assert_eq!(results[0].cells[&Bytes::from("f:a")], Bytes::from("ten"));
    assert_eq!(results[0].timestamp, 15);
}

#[test]
fn test_scanner_row_timestamp_is_newest_cell() {
    let memcache = Memcache::new();

    memcache.put(key("row", "f:a", 10), "a");
    memcache.put(key("row", "f:b", 42), "b");
    memcache.put(key("row", "f:c", 7), "c");

    let result = memcache
        .get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"")
        .next()
        .unwrap();

    assert_eq!(result.timestamp, 42);
}

#[test]
fn test_scanner_fresh_results_per_row() {
    let memcache = Memcache::new();

    memcache.put(key("a", "f:x", 1), "ax");
    memcache.put(key("a", "f:y", 1), "ay");
    memcache.put(key("b", "f:z", 1), "bz");

    let results: Vec<RowResult> = memcache
        .get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"")
        .collect();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].cells.len(), 2);
    assert_eq!(results[1].cells.len(), 1);
    assert!(results[1].cells.contains_key(&Bytes::from("f:z")));
}

#[test]
fn test_scanner_merges_snapshot_and_active() {
    let memcache = Memcache::new();

    memcache.put(key("a", "f:q", 1), "a-old");
    memcache.put(key("c", "f:q", 1), "c");
    let _snapshot = memcache.snapshot().unwrap();
    memcache.put(key("a", "f:q", 2), "a-new");
    memcache.put(key("b", "f:q", 1), "b");
    memcache.delete(key("c", "f:q", 2));

    let results: Vec<RowResult> = memcache
        .get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"")
        .collect();

    assert_eq!(rows_of(&results), vec![Bytes::from("a"), Bytes::from("b")]);
    assert_eq!(results[0].cells[&Bytes::from("f:q")], Bytes::from("a-new"));
}

#[test]
fn test_scanner_sees_writes_to_rows_not_yet_reached() {
    let memcache = Memcache::new();

    memcache.put(key("a", "f:q", 1), "a");
    memcache.put(key("c", "f:q", 1), "c");

    let mut scanner = memcache.get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"");
    assert_eq!(scanner.next().unwrap().row, Bytes::from("a"));

    memcache.put(key("c", "f:r", 1), "late");

    let c = scanner.next().unwrap();
    assert_eq!(c.row, Bytes::from("c"));
    assert_eq!(c.cells.len(), 2);
}

#[test]
fn test_scanner_close() {
    let memcache = Memcache::new();
    add_rows(&memcache, 1);

    let mut scanner = memcache.get_scanner(LATEST_TIMESTAMP, ColumnSet::all(), b"");
    assert!(scanner.next().is_some());

    scanner.close();
    assert!(scanner.next().is_none());

    // Closing twice is harmless
    scanner.close();
    assert!(scanner.next().is_none());
}
