//! Two-way merge of the active and snapshot generations
//!
//! Reads never copy the generations into one structure; they walk both
//! sorted maps side by side.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use crossbeam_skiplist::map::Entry;

use crate::key::VersionedKey;

use super::table::Generation;
use super::MemcacheEntry;

pub(crate) type KeyedEntry = (VersionedKey, MemcacheEntry);

fn owned(entry: Entry<'_, VersionedKey, MemcacheEntry>) -> KeyedEntry {
    (entry.key().clone(), entry.value().clone())
}

/// Merges two key-ordered streams into one.
///
/// When both streams hold the identical key the `newer` entry is yielded and
/// the `older` one is dropped.
pub(crate) struct MergeIter<A, B>
where
    A: Iterator<Item = KeyedEntry>,
    B: Iterator<Item = KeyedEntry>,
{
    newer: Peekable<A>,
    older: Peekable<B>,
}

impl<A, B> MergeIter<A, B>
where
    A: Iterator<Item = KeyedEntry>,
    B: Iterator<Item = KeyedEntry>,
{
    pub(crate) fn new(newer: A, older: B) -> Self {
        Self {
            newer: newer.peekable(),
            older: older.peekable(),
        }
    }
}

impl<A, B> Iterator for MergeIter<A, B>
where
    A: Iterator<Item = KeyedEntry>,
    B: Iterator<Item = KeyedEntry>,
{
    type Item = KeyedEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.newer.peek(), self.older.peek()) {
            (Some((a, _)), Some((b, _))) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => return None,
        };

        match order {
            Ordering::Less => self.newer.next(),
            Ordering::Greater => self.older.next(),
            Ordering::Equal => {
                self.older.next();
                self.newer.next()
            }
        }
    }
}

/// The (active, snapshot) pair captured at the start of a read
pub(crate) struct View {
    active: Arc<Generation>,
    snapshot: Option<Arc<Generation>>,

    /// Entries with a timestamp below this are expired
    expired_before: Option<u64>,
}

impl View {
    pub(crate) fn new(
        active: Arc<Generation>,
        snapshot: Option<Arc<Generation>>,
        expired_before: Option<u64>,
    ) -> Self {
        Self {
            active,
            snapshot,
            expired_before,
        }
    }

    fn generations(&self) -> impl Iterator<Item = &Generation> + '_ {
        std::iter::once(self.active.as_ref()).chain(self.snapshot.as_deref())
    }

    /// All live entries at or after `start`, merged in key order
    pub(crate) fn scan_from(&self, start: VersionedKey) -> impl Iterator<Item = KeyedEntry> + '_ {
        let newer = self.active.map.range(start.clone()..).map(owned);
        let older = self
            .snapshot
            .iter()
            .flat_map(move |g| g.map.range(start.clone()..))
            .map(owned);

        let expired_before = self.expired_before;
        MergeIter::new(newer, older)
            .filter(move |(key, _)| expired_before.map_or(true, |floor| key.timestamp() >= floor))
    }

    /// All live entries of exactly `row`, merged in key order
    pub(crate) fn row_entries(&self, row: &[u8]) -> impl Iterator<Item = KeyedEntry> + '_ {
        let target = Bytes::copy_from_slice(row);
        self.scan_from(VersionedKey::first_on_row(row))
            .take_while(move |(key, _)| key.row() == &target)
    }

    /// Whether any generation holds an entry on `row`
    pub(crate) fn contains_row(&self, row: &[u8]) -> bool {
        let probe = VersionedKey::first_on_row(row);
        self.generations().any(|g| {
            g.map
                .lower_bound(Bound::Included(&probe))
                .map_or(false, |e| &e.key().row()[..] == row)
        })
    }

    /// Greatest row strictly before `row` in either generation
    pub(crate) fn row_before(&self, row: &[u8]) -> Option<Bytes> {
        let probe = VersionedKey::first_on_row(row);
        self.generations()
            .filter_map(|g| {
                g.map
                    .upper_bound(Bound::Excluded(&probe))
                    .map(|e| e.key().row().clone())
            })
            .max()
    }

    /// Smallest row strictly after `row` in either generation
    pub(crate) fn row_after(&self, row: &[u8]) -> Option<Bytes> {
        let probe = VersionedKey::first_after_row(row);
        self.generations()
            .filter_map(|g| {
                g.map
                    .lower_bound(Bound::Included(&probe))
                    .map(|e| e.key().row().clone())
            })
            .min()
    }

    /// Greatest row at or before `row`
    pub(crate) fn floor_row(&self, row: &[u8]) -> Option<Bytes> {
        if self.contains_row(row) {
            Some(Bytes::copy_from_slice(row))
        } else {
            self.row_before(row)
        }
    }
}
