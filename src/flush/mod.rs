//! Flush Module
//!
//! Moves frozen memcache snapshots to durable storage.
//!
//! ## Responsibilities
//! - Define the boundary to the storage writer (`FlushTarget`)
//! - Run snapshot → persist → clear as one serialized flush path
//! - Keep a snapshot whose persist failed, and retry it first next time
//! - Background flushing on request (`FlushWorker`)
//!
//! ## Flush Sequence
//! ```text
//!   Memcache::snapshot()  ──▶  FlushTarget::persist(&snapshot)
//!                                   │
//!                     Ok ───────────┴─────────── Err
//!                      │                          │
//!     Memcache::clear_snapshot(&snapshot)   snapshot stays held,
//!                                           next flush retries it
//! ```

mod flusher;
mod worker;

use std::sync::Arc;

use crate::error::Result;
use crate::memcache::Snapshot;

pub use flusher::{FlushStats, Flusher};
pub use worker::{FlushMetrics, FlushWorker};

/// Writes a frozen snapshot to durable storage.
///
/// Entries arrive through `Snapshot::iter` in key order, tombstones
/// included. Returning an error keeps the snapshot held by the memcache.
pub trait FlushTarget: Send + Sync {
    fn persist(&self, snapshot: &Snapshot) -> Result<()>;
}

impl<T: FlushTarget + ?Sized> FlushTarget for Arc<T> {
    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        (**self).persist(snapshot)
    }
}
