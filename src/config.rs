//! Configuration for hmemcache
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// Main configuration for a memcache-backed store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Flush Configuration
    // -------------------------------------------------------------------------
    /// Approximate heap size (in bytes) of the active generation at which a
    /// background flush is requested
    pub flush_size_limit: usize,

    /// Name given to the background flush thread
    pub flush_thread_name: String,

    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Cell time-to-live. Cells whose timestamp (unix millis) is older than
    /// `now - ttl` are invisible to reads. `None` keeps cells forever.
    pub ttl: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_size_limit: 64 * 1024 * 1024, // 64 MB
            flush_thread_name: "memcache-flush".to_string(),
            ttl: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the flush size limit (in bytes)
    pub fn flush_size_limit(mut self, size: usize) -> Self {
        self.config.flush_size_limit = size;
        self
    }

    /// Set the name of the background flush thread
    pub fn flush_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.flush_thread_name = name.into();
        self
    }

    /// Set the cell time-to-live
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = Some(ttl);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
