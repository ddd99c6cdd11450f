//! Memcache implementation
//!
//! Two SkipMap generations (active + optional frozen snapshot) behind a
//! pointer swap guarded by an RwLock.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossbeam_skiplist::SkipMap;
use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{MemcacheError, Result};
use crate::key::{current_timestamp, VersionedKey};

use super::merge::View;
use super::{MemcacheEntry, Snapshot};

/// One sorted map of entries plus its accounting
pub(crate) struct Generation {
    /// Monotonic id, used to name the generation in logs and errors
    pub(crate) id: u64,

    /// Entries in `VersionedKey` order
    pub(crate) map: SkipMap<VersionedKey, MemcacheEntry>,

    /// Approximate bytes held (keys + values)
    heap_size: AtomicUsize,
}

impl Generation {
    fn new(id: u64) -> Self {
        Self {
            id,
            map: SkipMap::new(),
            heap_size: AtomicUsize::new(0),
        }
    }

    fn insert(&self, key: VersionedKey, entry: MemcacheEntry) -> usize {
        let added = key.heap_size() + entry.heap_size();
        let replaced = self
            .map
            .get(&key)
            .map(|e| e.key().heap_size() + e.value().heap_size());

        self.map.insert(key, entry);

        let mut size = self.heap_size.fetch_add(added, Ordering::SeqCst) + added;
        if let Some(replaced) = replaced {
            // Saturating: two writers racing on one key may both subtract
            let _ = self
                .heap_size
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                    Some(s.saturating_sub(replaced))
                });
            size = size.saturating_sub(replaced);
        }
        size
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.heap_size.load(Ordering::SeqCst)
    }
}

/// The (active, snapshot) pointer pair; the only shared mutable state
struct Generations {
    active: Arc<Generation>,
    snapshot: Option<Arc<Generation>>,
}

/// In-memory multi-version buffer for recent writes
///
/// ## Concurrency Model
///
/// - **Writes** (`add`): lock-free SkipMap insert, performed while holding the
///   shared side of `generations` so the choice of target map cannot race
///   with `snapshot()`. Writers never block each other.
/// - **Snapshot / clear**: take the exclusive side only for the pointer swap.
///   Persisting the snapshot happens outside any lock.
/// - **Reads**: clone both `Arc`s under the shared lock, then iterate with no
///   lock held. A captured snapshot outlives `clear_snapshot()` until the
///   last reader drops it.
pub struct Memcache {
    generations: RwLock<Generations>,

    /// Next generation id
    next_generation: AtomicU64,

    /// Cells older than `now - ttl` are invisible to reads
    ttl: Option<Duration>,
}

impl Memcache {
    /// Create a new empty memcache whose cells never expire
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    /// Create a memcache using the read settings from `config`
    pub fn with_config(config: &Config) -> Self {
        Self::with_ttl(config.ttl)
    }

    fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            generations: RwLock::new(Generations {
                active: Arc::new(Generation::new(0)),
                snapshot: None,
            }),
            next_generation: AtomicU64::new(1),
            ttl,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert an entry into the active generation.
    ///
    /// An entry with the identical key (same row, column and timestamp) is
    /// overwritten. Returns the active generation's approximate size
    /// afterwards.
    pub fn add(&self, key: VersionedKey, entry: MemcacheEntry) -> usize {
        let generations = self.generations.read();
        generations.active.insert(key, entry)
    }

    /// Insert a value
    pub fn put(&self, key: VersionedKey, value: impl Into<Bytes>) -> usize {
        self.add(key, MemcacheEntry::Value(value.into()))
    }

    /// Insert a tombstone at the key's timestamp
    pub fn delete(&self, key: VersionedKey) -> usize {
        self.add(key, MemcacheEntry::Tombstone)
    }

    // =========================================================================
    // Snapshot Lifecycle
    // =========================================================================

    /// Freeze the active generation and install a fresh one.
    ///
    /// Fails if the previous snapshot has not been cleared yet.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let mut generations = self.generations.write();

        if let Some(held) = &generations.snapshot {
            tracing::error!(
                generation = held.id,
                "snapshot requested while a previous snapshot is still outstanding"
            );
            return Err(MemcacheError::SnapshotOutstanding {
                generation: held.id,
            });
        }

        let id = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let frozen = std::mem::replace(&mut generations.active, Arc::new(Generation::new(id)));
        generations.snapshot = Some(Arc::clone(&frozen));
        drop(generations);

        tracing::debug!(
            generation = frozen.id,
            entries = frozen.map.len(),
            heap_size = frozen.heap_size(),
            "memcache snapshot taken"
        );

        Ok(Snapshot::new(frozen))
    }

    /// Release the held snapshot after it has been persisted.
    ///
    /// `expected` must be the very snapshot returned by `snapshot()`;
    /// anything else is rejected and nothing is cleared.
    pub fn clear_snapshot(&self, expected: &Snapshot) -> Result<()> {
        let mut generations = self.generations.write();

        let is_held = generations
            .snapshot
            .as_ref()
            .map_or(false, |held| Arc::ptr_eq(held, expected.generation_ref()));

        if !is_held {
            let held = generations.snapshot.as_ref().map(|g| g.id);
            tracing::error!(
                expected = expected.generation(),
                held = ?held,
                "clear_snapshot called with a snapshot that is not the one held"
            );
            return Err(MemcacheError::SnapshotMismatch {
                expected: expected.generation(),
                held,
            });
        }

        generations.snapshot = None;
        drop(generations);

        tracing::debug!(generation = expected.generation(), "memcache snapshot cleared");
        Ok(())
    }

    /// The currently held snapshot, if any
    pub fn held_snapshot(&self) -> Option<Snapshot> {
        self.generations
            .read()
            .snapshot
            .as_ref()
            .map(|g| Snapshot::new(Arc::clone(g)))
    }

    /// Entry count of the held snapshot, or 0 when none is held
    pub fn snapshot_size(&self) -> usize {
        self.generations
            .read()
            .snapshot
            .as_ref()
            .map_or(0, |g| g.map.len())
    }

    // =========================================================================
    // Accounting (active generation)
    // =========================================================================

    /// Approximate size in bytes of the active generation
    pub fn size(&self) -> usize {
        self.generations.read().active.heap_size()
    }

    /// Number of entries in the active generation
    pub fn entry_count(&self) -> usize {
        self.generations.read().active.map.len()
    }

    /// Whether the active generation holds no entries
    pub fn is_empty(&self) -> bool {
        self.generations.read().active.map.is_empty()
    }

    /// Check if the active generation has reached `size_limit`
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Capture the current (active, snapshot) pair for a read
    pub(crate) fn view(&self) -> View {
        let generations = self.generations.read();
        // A TTL beyond u64 millis never expires anything
        let expired_before = self.ttl.map(|ttl| {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            current_timestamp().saturating_sub(ttl_ms)
        });
        View::new(
            Arc::clone(&generations.active),
            generations.snapshot.clone(),
            expired_before,
        )
    }
}

impl Default for Memcache {
    fn default() -> Self {
        Self::new()
    }
}
