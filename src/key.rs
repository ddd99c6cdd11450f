//! Versioned Key
//!
//! The composite `(row, column, timestamp)` key every memcache entry is
//! stored under.
//!
//! ## Ordering
//! ```text
//! row ASC  →  column ASC  →  timestamp DESC (newest first)
//!
//!   ("row1", "info:a", 30)
//!   ("row1", "info:a", 20)
//!   ("row1", "info:b", 50)
//!   ("row2", "info:a", 10)
//! ```
//! All read paths depend on this order: within a row, the first entry seen
//! for a column is its newest version.
//!
//! ## Columns
//! A column is `family:qualifier`. The family must be non-empty; the
//! qualifier may be empty.

use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{MemcacheError, Result};

/// Timestamp meaning "the newest possible version"
pub const LATEST_TIMESTAMP: u64 = u64::MAX;

/// Separates the family from the qualifier in a column name
pub const FAMILY_DELIMITER: u8 = b':';

/// Ordered composite key: row, column, timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedKey {
    row: Bytes,
    column: Bytes,
    timestamp: u64,
}

impl VersionedKey {
    /// Create a key, validating the row and column
    pub fn new(row: impl Into<Bytes>, column: impl Into<Bytes>, timestamp: u64) -> Result<Self> {
        let key = Self {
            row: row.into(),
            column: column.into(),
            timestamp,
        };
        key.validate()?;
        Ok(key)
    }

    /// Create a key at `LATEST_TIMESTAMP`
    pub fn latest(row: impl Into<Bytes>, column: impl Into<Bytes>) -> Result<Self> {
        Self::new(row, column, LATEST_TIMESTAMP)
    }

    /// The smallest possible key on `row`; sorts before every stored key of
    /// that row.
    pub(crate) fn first_on_row(row: &[u8]) -> Self {
        Self {
            row: Bytes::copy_from_slice(row),
            column: Bytes::new(),
            timestamp: LATEST_TIMESTAMP,
        }
    }

    /// The smallest possible key on the first row strictly after `row`
    pub(crate) fn first_after_row(row: &[u8]) -> Self {
        let mut successor = Vec::with_capacity(row.len() + 1);
        successor.extend_from_slice(row);
        successor.push(0);
        Self {
            row: Bytes::from(successor),
            column: Bytes::new(),
            timestamp: LATEST_TIMESTAMP,
        }
    }

    /// Key for `row`/`column` at the latest timestamp, no validation.
    /// Used for keys derived from already stored entries.
    pub(crate) fn stripped(row: Bytes, column: Bytes) -> Self {
        Self {
            row,
            column,
            timestamp: LATEST_TIMESTAMP,
        }
    }

    pub fn row(&self) -> &Bytes {
        &self.row
    }

    pub fn column(&self) -> &Bytes {
        &self.column
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Family portion of the column (before the delimiter)
    pub fn family(&self) -> &[u8] {
        split_column(&self.column).0
    }

    /// Qualifier portion of the column (after the delimiter)
    pub fn qualifier(&self) -> &[u8] {
        split_column(&self.column).1
    }

    /// Same row and column, any timestamp
    pub fn matches_row_column(&self, other: &VersionedKey) -> bool {
        self.row == other.row && self.column == other.column
    }

    /// Copy of this key at a different timestamp
    pub fn with_timestamp(&self, timestamp: u64) -> Self {
        Self {
            row: self.row.clone(),
            column: self.column.clone(),
            timestamp,
        }
    }

    /// Approximate heap footprint of the key
    pub fn heap_size(&self) -> usize {
        self.row.len() + self.column.len() + std::mem::size_of::<u64>()
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode to the binary form handed to storage
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from the binary form, rejecting malformed keys
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let key: VersionedKey = bincode::deserialize(bytes)?;
        key.validate()?;
        Ok(key)
    }

    fn validate(&self) -> Result<()> {
        if self.row.is_empty() {
            return Err(MemcacheError::InvalidKey("row must not be empty".to_string()));
        }
        match self.column.iter().position(|&b| b == FAMILY_DELIMITER) {
            Some(0) => Err(MemcacheError::InvalidKey(format!(
                "column {:?} has an empty family",
                String::from_utf8_lossy(&self.column)
            ))),
            Some(_) => Ok(()),
            None => Err(MemcacheError::InvalidKey(format!(
                "column {:?} is missing the family delimiter ':'",
                String::from_utf8_lossy(&self.column)
            ))),
        }
    }
}

impl Ord for VersionedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column.cmp(&other.column))
            // Newest first
            .then_with(|| other.timestamp.cmp(&self.timestamp))
    }
}

impl PartialOrd for VersionedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            String::from_utf8_lossy(&self.row),
            String::from_utf8_lossy(&self.column),
            self.timestamp
        )
    }
}

/// Split a column into (family, qualifier). A column without a delimiter is
/// all family.
pub(crate) fn split_column(column: &[u8]) -> (&[u8], &[u8]) {
    match column.iter().position(|&b| b == FAMILY_DELIMITER) {
        Some(pos) => (&column[..pos], &column[pos + 1..]),
        None => (column, &[]),
    }
}

/// Current wall-clock time in unix milliseconds, the unit of timestamps
/// assigned by the store
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
