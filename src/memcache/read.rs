//! Row reconstruction
//!
//! Point and row reads over the merged (active + snapshot) key space.
//!
//! ## Visibility Rule
//! Entries of a row arrive column ascending, timestamp descending, so the
//! first entry met for a column is its newest version. That entry decides
//! the column: a value is visible, a tombstone hides it and every older
//! version.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::key::VersionedKey;

use super::merge::View;
use super::{Cell, ColumnSet, Memcache, MemcacheEntry};

impl Memcache {
    /// Collect the newest visible value of every selected column of `row`
    /// with a timestamp at or below `timestamp`.
    ///
    /// `deletes` and `results` are in/out so that a caller can chain newer
    /// tiers first:
    /// - a tombstone records `column -> timestamp` in `deletes`
    /// - a value is added to `results` unless `deletes` already holds a
    ///   delete of that column at or above the value's timestamp
    /// - columns already in `results` are left alone
    pub fn get_full(
        &self,
        row: &[u8],
        timestamp: u64,
        columns: &ColumnSet,
        deletes: &mut BTreeMap<Bytes, u64>,
        results: &mut BTreeMap<Bytes, Cell>,
    ) {
        let view = self.view();
        collect_row(&view, row, timestamp, columns, deletes, results);
    }

    /// Up to `versions` newest cells (0 = all) of `key`'s row and column at
    /// or below `key.timestamp()`, newest first.
    ///
    /// Stops at the first tombstone.
    pub fn get(&self, key: &VersionedKey, versions: usize) -> Vec<Cell> {
        let view = self.view();
        let mut cells = Vec::new();

        for (found, entry) in view.scan_from(key.clone()) {
            if !found.matches_row_column(key) {
                break;
            }
            match entry {
                MemcacheEntry::Tombstone => break,
                MemcacheEntry::Value(value) => {
                    cells.push(Cell::new(value, found.timestamp()));
                    if versions > 0 && cells.len() >= versions {
                        break;
                    }
                }
            }
        }

        cells
    }

    /// Smallest row strictly after `row`; the empty row yields the first
    /// row overall.
    ///
    /// Rows whose columns are all deleted are still returned: any row with
    /// at least one entry counts here. Use `get_row_key_at_or_before` for a
    /// deletion-aware lookup.
    pub fn get_next_row(&self, row: &[u8]) -> Option<Bytes> {
        self.view().row_after(row)
    }

    /// Find the greatest row at or before `row` with a surviving column and
    /// record its columns in `candidates` as
    /// `(row, column, LATEST_TIMESTAMP) -> timestamp`.
    ///
    /// Rows whose newest entries are all tombstones are skipped. When
    /// `candidates` already holds a row from another tier, tombstones here
    /// remove its columns at or below their timestamp, newer values update
    /// them, and a greater surviving row replaces it.
    pub fn get_row_key_at_or_before(
        &self,
        row: &[u8],
        candidates: &mut BTreeMap<VersionedKey, u64>,
    ) {
        let view = self.view();
        let mut next = view.floor_row(row);

        while let Some(candidate_row) = next {
            let held_row = candidates.keys().next().map(|k| k.row().clone());
            if let Some(held) = &held_row {
                // Another tier already found a greater row
                if *held > candidate_row {
                    return;
                }
            }

            let latest = latest_per_column(&view, &candidate_row);

            if held_row.as_ref() == Some(&candidate_row) {
                for (column, (timestamp, entry)) in latest {
                    let key = VersionedKey::stripped(candidate_row.clone(), column);
                    let held_ts = candidates.get(&key).copied();
                    match entry {
                        MemcacheEntry::Tombstone => {
                            if held_ts.map_or(false, |ts| ts <= timestamp) {
                                candidates.remove(&key);
                            }
                        }
                        MemcacheEntry::Value(_) => {
                            if held_ts.map_or(true, |ts| ts < timestamp) {
                                candidates.insert(key, timestamp);
                            }
                        }
                    }
                }
            } else {
                let surviving: Vec<(Bytes, u64)> = latest
                    .into_iter()
                    .filter(|(_, (_, entry))| !entry.is_tombstone())
                    .map(|(column, (timestamp, _))| (column, timestamp))
                    .collect();

                if !surviving.is_empty() {
                    candidates.clear();
                    for (column, timestamp) in surviving {
                        candidates.insert(
                            VersionedKey::stripped(candidate_row.clone(), column),
                            timestamp,
                        );
                    }
                }
            }

            if candidates
                .keys()
                .next()
                .map_or(false, |k| k.row() == &candidate_row)
            {
                return;
            }

            next = view.row_before(&candidate_row);
        }
    }
}

/// Shared row walk behind `get_full` and the scanner
pub(crate) fn collect_row(
    view: &View,
    row: &[u8],
    timestamp: u64,
    columns: &ColumnSet,
    deletes: &mut BTreeMap<Bytes, u64>,
    results: &mut BTreeMap<Bytes, Cell>,
) {
    for (key, entry) in view.row_entries(row) {
        if key.timestamp() > timestamp || !columns.matches(key.column()) {
            continue;
        }
        if results.contains_key(key.column()) {
            continue;
        }

        match entry {
            MemcacheEntry::Tombstone => {
                let deleted_at = deletes.entry(key.column().clone()).or_insert(key.timestamp());
                if *deleted_at < key.timestamp() {
                    *deleted_at = key.timestamp();
                }
            }
            MemcacheEntry::Value(value) => {
                let shadowed = deletes
                    .get(key.column())
                    .map_or(false, |&deleted_at| deleted_at >= key.timestamp());
                if !shadowed {
                    results.insert(key.column().clone(), Cell::new(value, key.timestamp()));
                }
            }
        }
    }
}

/// Newest entry of each column on `row`, regardless of timestamp
fn latest_per_column(view: &View, row: &[u8]) -> BTreeMap<Bytes, (u64, MemcacheEntry)> {
    let mut latest = BTreeMap::new();
    for (key, entry) in view.row_entries(row) {
        latest
            .entry(key.column().clone())
            .or_insert((key.timestamp(), entry));
    }
    latest
}
