//! Configuration for hashsetd
//!
//! Centralized configuration with sensible defaults. Loaded once before the
//! server starts and never mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a hashsetd instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Dataset Configuration
    // -------------------------------------------------------------------------
    /// Plain-text digest list, one 32-hex digest per line
    pub dataset_path: PathBuf,

    /// Capacity reserved up front for the index
    pub expected_entries: usize,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Only accept protocol 1.x handshakes
    pub legacy_only: bool,

    /// Answer STATUS with index size and host load
    pub status_enabled: bool,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Deadline for one complete line from a client (milliseconds)
    pub line_timeout_ms: u64,

    /// Granularity of the readiness wait inside a line read (milliseconds)
    pub poll_interval_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// Ceiling on buffered, not yet terminated input per connection
    pub max_line_bytes: usize,

    // -------------------------------------------------------------------------
    // Lifecycle Configuration
    // -------------------------------------------------------------------------
    /// Stop accepting once no sessions are active for this long
    pub idle_shutdown: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("./hashes.txt"),
            expected_entries: 40_000_000,
            legacy_only: false,
            status_enabled: false,
            listen_addr: "0.0.0.0:9120".to_string(),
            line_timeout_ms: 15_000,
            poll_interval_ms: 1_000,
            write_timeout_ms: 5_000,
            max_line_bytes: 1024 * 1024, // 1 MB
            idle_shutdown: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn line_timeout(&self) -> Duration {
        Duration::from_millis(self.line_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the digest list to load at startup
    pub fn dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dataset_path = path.into();
        self
    }

    /// Set the capacity reserved for the index
    pub fn expected_entries(mut self, count: usize) -> Self {
        self.config.expected_entries = count;
        self
    }

    /// Restrict clients to the single-shot 1.x protocol
    pub fn legacy_only(mut self, enabled: bool) -> Self {
        self.config.legacy_only = enabled;
        self
    }

    /// Enable the detailed STATUS reply
    pub fn status_enabled(mut self, enabled: bool) -> Self {
        self.config.status_enabled = enabled;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the per-line read deadline (in milliseconds)
    pub fn line_timeout_ms(mut self, ms: u64) -> Self {
        self.config.line_timeout_ms = ms;
        self
    }

    /// Set the readiness wait granularity (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the per-connection buffer ceiling (in bytes)
    pub fn max_line_bytes(mut self, bytes: usize) -> Self {
        self.config.max_line_bytes = bytes;
        self
    }

    /// Enable idle shutdown after the given quiet period
    pub fn idle_shutdown(mut self, after: Option<Duration>) -> Self {
        self.config.idle_shutdown = after;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
