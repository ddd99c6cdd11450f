//! Error types for hmemcache
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using MemcacheError
pub type Result<T> = std::result::Result<T, MemcacheError>;

/// Unified error type for memcache operations
#[derive(Debug, Error)]
pub enum MemcacheError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Snapshot Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot of generation {generation} is still outstanding")]
    SnapshotOutstanding { generation: u64 },

    #[error("Snapshot mismatch: asked to clear generation {expected}, held snapshot is {held:?}")]
    SnapshotMismatch { expected: u64, held: Option<u64> },

    // -------------------------------------------------------------------------
    // Flush Errors
    // -------------------------------------------------------------------------
    #[error("Flush failed: {0}")]
    Flush(String),

    #[error("Flush worker has stopped")]
    FlushWorkerStopped,
}

impl From<bincode::Error> for MemcacheError {
    fn from(e: bincode::Error) -> Self {
        MemcacheError::Serialization(e.to_string())
    }
}
