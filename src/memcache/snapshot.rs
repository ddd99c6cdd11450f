//! Snapshot handle
//!
//! A frozen generation handed to the flush path.

use std::fmt;
use std::sync::Arc;

use crossbeam_skiplist::map;

use crate::key::VersionedKey;

use super::table::Generation;
use super::MemcacheEntry;

/// Frozen view of a former active generation.
///
/// Clones share the same generation; `Memcache::clear_snapshot` accepts any
/// of them.
#[derive(Clone)]
pub struct Snapshot {
    generation: Arc<Generation>,
}

impl Snapshot {
    pub(crate) fn new(generation: Arc<Generation>) -> Self {
        Self { generation }
    }

    pub(crate) fn generation_ref(&self) -> &Arc<Generation> {
        &self.generation
    }

    /// Id of the frozen generation
    pub fn generation(&self) -> u64 {
        self.generation.id
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.generation.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generation.map.is_empty()
    }

    /// Approximate size in bytes
    pub fn heap_size(&self) -> usize {
        self.generation.heap_size()
    }

    /// Whether both handles refer to the same frozen generation
    pub fn same_as(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.generation, &other.generation)
    }

    /// Iterate all entries in key order (tombstones included)
    pub fn iter(&self) -> SnapshotIter<'_> {
        SnapshotIter {
            inner: self.generation.map.iter(),
        }
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("generation", &self.generation.id)
            .field("entries", &self.len())
            .field("heap_size", &self.heap_size())
            .finish()
    }
}

/// Iterator over snapshot entries in key order
pub struct SnapshotIter<'a> {
    inner: map::Iter<'a, VersionedKey, MemcacheEntry>,
}

impl<'a> Iterator for SnapshotIter<'a> {
    type Item = (VersionedKey, MemcacheEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|e| (e.key().clone(), e.value().clone()))
    }
}
