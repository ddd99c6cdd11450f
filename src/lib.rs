//! # hmemcache
//!
//! The in-memory write buffer of a log-structured, multi-versioned column
//! store:
//! - Ordered multi-version keys: (row, column, timestamp)
//! - Tombstones that shadow older versions on every read path
//! - Point-in-time snapshots for background flush, without blocking writers
//! - Full-row reads, next/floor row lookups and multi-row scans
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                                │
//! │         (timestamps, flush trigger, read defaults)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │  Memcache   │◀─────────│ FlushWorker  │
//!   │ active +    │ snapshot │  (Flusher)   │
//!   │ snapshot    │  clear   └──────┬───────┘
//!   └─────────────┘                 │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │ FlushTarget │
//!                           │ (external)  │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod memcache;
pub mod flush;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MemcacheError, Result};
pub use config::Config;
pub use key::{VersionedKey, LATEST_TIMESTAMP};
pub use memcache::{Cell, ColumnSet, Memcache, MemcacheEntry, MemcacheScanner, RowResult, Snapshot};
pub use flush::{FlushTarget, Flusher, FlushWorker};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hmemcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
