//! Store Module
//!
//! Region-level facade over one memcache and its flush path.
//!
//! ## Responsibilities
//! - Validate keys and assign write timestamps
//! - Buffer writes in the memcache
//! - Request a background flush when the memcache outgrows its limit
//! - Expose the memcache read paths with store defaults

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::Config;
use crate::error::Result;
use crate::flush::{FlushMetrics, FlushStats, FlushTarget, FlushWorker, Flusher};
use crate::key::{current_timestamp, VersionedKey, LATEST_TIMESTAMP};
use crate::memcache::{Cell, ColumnSet, Memcache, MemcacheEntry, MemcacheScanner};

/// A memcache plus the machinery that drains it
///
/// ## Concurrency Model
///
/// - **Writes** (put/delete): go straight to the memcache, no store-level
///   lock. Crossing `flush_size_limit` only enqueues a flush request.
/// - **Reads**: memcache read paths, concurrent with writes and flushes.
/// - **Flushes**: serialized inside `Flusher`, run by the background worker
///   or by an explicit `flush()`.
pub struct Store {
    /// Store configuration
    config: Config,

    /// In-memory buffer for recent writes
    memcache: Arc<Memcache>,

    /// Snapshot → persist → clear path (shared with the worker)
    flusher: Arc<Flusher>,

    /// Background flush thread
    worker: FlushWorker,
}

impl Store {
    /// Create a store that flushes into `target`
    pub fn open(config: Config, target: Arc<dyn FlushTarget>) -> Result<Self> {
        let memcache = Arc::new(Memcache::with_config(&config));
        let flusher = Arc::new(Flusher::new(Arc::clone(&memcache), target));
        let worker = FlushWorker::spawn(Arc::clone(&flusher), &config.flush_thread_name)?;

        tracing::debug!(
            flush_size_limit = config.flush_size_limit,
            ttl = ?config.ttl,
            "store opened"
        );

        Ok(Self {
            config,
            memcache,
            flusher,
            worker,
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write a value. `LATEST_TIMESTAMP` is replaced by the current time.
    pub fn put(
        &self,
        row: impl Into<Bytes>,
        column: impl Into<Bytes>,
        timestamp: u64,
        value: impl Into<Bytes>,
    ) -> Result<()> {
        let key = VersionedKey::new(row, column, resolve_timestamp(timestamp))?;
        self.write(key, MemcacheEntry::Value(value.into()))
    }

    /// Delete every version of a column at or below `timestamp`.
    /// `LATEST_TIMESTAMP` is replaced by the current time.
    pub fn delete(
        &self,
        row: impl Into<Bytes>,
        column: impl Into<Bytes>,
        timestamp: u64,
    ) -> Result<()> {
        let key = VersionedKey::new(row, column, resolve_timestamp(timestamp))?;
        self.write(key, MemcacheEntry::Tombstone)
    }

    fn write(&self, key: VersionedKey, entry: MemcacheEntry) -> Result<()> {
        let new_size = self.memcache.add(key, entry);

        if new_size >= self.config.flush_size_limit {
            tracing::debug!(
                size = new_size,
                limit = self.config.flush_size_limit,
                "memcache over flush limit, requesting flush"
            );
            self.worker.request_flush()?;
        }

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Newest visible value of every column of `row`
    pub fn get_full(&self, row: &[u8]) -> BTreeMap<Bytes, Cell> {
        let mut deletes = BTreeMap::new();
        let mut results = BTreeMap::new();
        self.memcache
            .get_full(row, LATEST_TIMESTAMP, &ColumnSet::all(), &mut deletes, &mut results);
        results
    }

    /// Up to `versions` newest cells of one column (0 = all)
    pub fn get(
        &self,
        row: impl Into<Bytes>,
        column: impl Into<Bytes>,
        versions: usize,
    ) -> Result<Vec<Cell>> {
        let key = VersionedKey::latest(row, column)?;
        Ok(self.memcache.get(&key, versions))
    }

    /// Smallest row after `row`
    pub fn get_next_row(&self, row: &[u8]) -> Option<Bytes> {
        self.memcache.get_next_row(row)
    }

    /// Greatest row at or before `row` with a surviving column, and the
    /// timestamps of its columns
    pub fn get_row_key_at_or_before(&self, row: &[u8]) -> BTreeMap<VersionedKey, u64> {
        let mut candidates = BTreeMap::new();
        self.memcache.get_row_key_at_or_before(row, &mut candidates);
        candidates
    }

    /// Scan the newest values of `columns` from `start_row` onwards
    pub fn scanner(&self, columns: ColumnSet, start_row: &[u8]) -> MemcacheScanner {
        self.memcache.get_scanner(LATEST_TIMESTAMP, columns, start_row)
    }

    // =========================================================================
    // Flush / Lifecycle
    // =========================================================================

    /// Flush synchronously
    pub fn flush(&self) -> Result<Option<FlushStats>> {
        self.flusher.flush()
    }

    /// Stop the worker and flush whatever is still buffered
    pub fn close(self) -> Result<()> {
        self.worker.shutdown()?;

        // A failed background flush may have left a snapshot held
        while self.memcache.snapshot_size() > 0 || !self.memcache.is_empty() {
            if self.flusher.flush()?.is_none() {
                break;
            }
        }

        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn memcache(&self) -> &Arc<Memcache> {
        &self.memcache
    }

    pub fn flush_metrics(&self) -> &FlushMetrics {
        self.worker.metrics()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn resolve_timestamp(timestamp: u64) -> u64 {
    if timestamp == LATEST_TIMESTAMP {
        current_timestamp()
    } else {
        timestamp
    }
}
