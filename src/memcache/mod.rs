//! Memcache Module
//!
//! Multi-version in-memory buffer for recent writes.
//!
//! ## Responsibilities
//! - Concurrent, ordered, multi-version writes
//! - Point-in-time snapshots for background flush
//! - Tombstones that shadow older versions on every read path
//! - Row reads, row navigation and multi-row scans
//!
//! ## Generations
//! ```text
//!            add()                          snapshot()
//!              │                                │
//!              ▼                                ▼
//!   ┌────────────────────┐   swap    ┌────────────────────┐
//!   │  active generation │ ────────▶ │ snapshot generation│ ──▶ FlushTarget
//!   │   (SkipMap, rw)    │           │  (SkipMap, frozen) │
//!   └────────────────────┘           └────────────────────┘
//!              ▲                                │
//!              └──── fresh empty map     clear_snapshot()
//! ```
//!
//! Reads merge both generations in key order; neither is ever consulted
//! alone.

mod columns;
mod table;
mod merge;
mod read;
mod scanner;
mod snapshot;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use columns::ColumnSet;
pub use table::Memcache;
pub use scanner::{MemcacheScanner, RowResult};
pub use snapshot::{Snapshot, SnapshotIter};

/// Entry stored in the memcache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemcacheEntry {
    /// A live value
    Value(Bytes),

    /// A delete marker; shadows every version of the column at or below the
    /// timestamp of the key it is stored under
    Tombstone,
}

impl MemcacheEntry {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, MemcacheEntry::Tombstone)
    }

    /// Approximate heap footprint of the entry
    pub fn heap_size(&self) -> usize {
        match self {
            MemcacheEntry::Value(v) => v.len(),
            MemcacheEntry::Tombstone => 0,
        }
    }
}

/// A value read back together with its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub value: Bytes,
    pub timestamp: u64,
}

impl Cell {
    pub fn new(value: Bytes, timestamp: u64) -> Self {
        Self { value, timestamp }
    }
}
