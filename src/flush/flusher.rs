//! Synchronous flush path

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::Result;
use crate::memcache::Memcache;

use super::FlushTarget;

/// Outcome of one successful flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushStats {
    /// Generation id of the persisted snapshot
    pub generation: u64,

    /// Entries written (tombstones included)
    pub entries: usize,

    /// Approximate bytes of the snapshot
    pub heap_size: usize,

    /// Whether this was a retry of a snapshot left by an earlier failure
    pub retried: bool,

    pub elapsed: Duration,
}

/// Serialized snapshot → persist → clear
///
/// ## Concurrency:
/// - `flush_lock` keeps at most one flush in progress, whether it was
///   started by the background worker or a direct `flush()` call
/// - Writers and readers of the memcache are not blocked while the target
///   persists
pub struct Flusher {
    memcache: Arc<Memcache>,
    target: Arc<dyn FlushTarget>,
    flush_lock: Mutex<()>,
}

impl Flusher {
    pub fn new(memcache: Arc<Memcache>, target: Arc<dyn FlushTarget>) -> Self {
        Self {
            memcache,
            target,
            flush_lock: Mutex::new(()),
        }
    }

    /// Persist one snapshot.
    ///
    /// Steps:
    /// 1. Reuse a held snapshot (earlier failure) or take a new one
    /// 2. Empty snapshot: clear it, nothing to write
    /// 3. Hand it to the target
    /// 4. On success clear it; on failure keep it and return the error
    ///
    /// Returns `Ok(None)` when there was nothing to write.
    pub fn flush(&self) -> Result<Option<FlushStats>> {
        let _flush_guard = self.flush_lock.lock();
        let started = Instant::now();

        // Step 1: Pick the snapshot
        let (snapshot, retried) = match self.memcache.held_snapshot() {
            Some(held) => {
                tracing::info!(
                    generation = held.generation(),
                    entries = held.len(),
                    "retrying outstanding memcache snapshot"
                );
                (held, true)
            }
            None => (self.memcache.snapshot()?, false),
        };

        // Step 2: Nothing buffered
        if snapshot.is_empty() {
            self.memcache.clear_snapshot(&snapshot)?;
            tracing::debug!(generation = snapshot.generation(), "skipping flush of empty snapshot");
            return Ok(None);
        }

        // Step 3: Persist
        if let Err(e) = self.target.persist(&snapshot) {
            tracing::warn!(
                generation = snapshot.generation(),
                entries = snapshot.len(),
                error = %e,
                "memcache flush failed; snapshot kept for retry"
            );
            return Err(e);
        }

        // Step 4: Release
        self.memcache.clear_snapshot(&snapshot)?;

        let stats = FlushStats {
            generation: snapshot.generation(),
            entries: snapshot.len(),
            heap_size: snapshot.heap_size(),
            retried,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            generation = stats.generation,
            entries = stats.entries,
            heap_size = stats.heap_size,
            retried = stats.retried,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "memcache flush complete"
        );

        Ok(Some(stats))
    }
}
