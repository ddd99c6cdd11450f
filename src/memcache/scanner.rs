//! Memcache scanner
//!
//! Forward, row-at-a-time cursor over the merged generations.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::key::LATEST_TIMESTAMP;

use super::merge::View;
use super::read::collect_row;
use super::{ColumnSet, Memcache};

/// One row produced by a scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    pub row: Bytes,

    /// The read ceiling, or the newest cell timestamp in the row when the
    /// ceiling is `LATEST_TIMESTAMP`
    pub timestamp: u64,

    /// Column -> newest visible value
    pub cells: BTreeMap<Bytes, Bytes>,
}

/// Row cursor over a memcache.
///
/// Holds the generations that existed when it was created and re-reads them
/// row by row, so writes landing in rows it has not reached yet may show up.
/// Rows without a surviving selected column are skipped.
pub struct MemcacheScanner {
    view: Option<View>,
    timestamp: u64,
    columns: ColumnSet,
    current_row: Option<Bytes>,
}

impl Memcache {
    /// Open a scanner over rows at or after `start_row`, reading the newest
    /// version at or below `timestamp` of every column in `columns`
    pub fn get_scanner(
        &self,
        timestamp: u64,
        columns: ColumnSet,
        start_row: &[u8],
    ) -> MemcacheScanner {
        MemcacheScanner {
            view: Some(self.view()),
            timestamp,
            columns,
            current_row: Some(Bytes::copy_from_slice(start_row)),
        }
    }
}

impl MemcacheScanner {
    /// Whether the scanner selects every column
    pub fn is_wildcard(&self) -> bool {
        self.columns.is_wildcard()
    }

    /// Release the captured generations; the scanner yields nothing after
    pub fn close(&mut self) {
        self.view = None;
        self.current_row = None;
    }
}

impl Iterator for MemcacheScanner {
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        let view = self.view.as_ref()?;

        while let Some(row) = self.current_row.take() {
            let mut deletes = BTreeMap::new();
            let mut found = BTreeMap::new();
            collect_row(view, &row, self.timestamp, &self.columns, &mut deletes, &mut found);

            self.current_row = view.row_after(&row);

            if found.is_empty() {
                tracing::trace!(row = ?row, "scanner skipping row without surviving columns");
                continue;
            }

            let timestamp = if self.timestamp == LATEST_TIMESTAMP {
                found
                    .values()
                    .map(|cell| cell.timestamp)
                    .filter(|&ts| ts != LATEST_TIMESTAMP)
                    .max()
                    .unwrap_or(0)
            } else {
                self.timestamp
            };

            let cells = found
                .into_iter()
                .map(|(column, cell)| (column, cell.value))
                .collect();

            return Some(RowResult { row, timestamp, cells });
        }

        None
    }
}
