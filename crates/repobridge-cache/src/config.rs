//! Cache configuration.

use serde::Deserialize;
use std::time::Duration;

/// Which backend `build_cache` creates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// No caching. Stale reads cannot happen when the store is changed
    /// behind the cache's back.
    #[default]
    None,
    /// Per-entity LRU maps in this process.
    InProcess,
    /// A shared Redis instance.
    Distributed,
}

/// Cache configuration.
///
/// # Example
///
/// ```
/// use repobridge_cache::{CacheBackendKind, CacheConfig};
///
/// let config = CacheConfig::new()
///     .backend(CacheBackendKind::InProcess)
///     .capacity(500)
///     .ttl_secs(60);
/// assert_eq!(config.capacity, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// Maximum entries per entity region (in-process backend).
    pub capacity: usize,
    /// Entry lifetime; `None` keeps entries until evicted.
    pub ttl_secs: Option<u64>,
    pub redis_url: String,
    /// Prefix of every key written to Redis.
    pub key_prefix: String,
    /// Connect, read and write timeout for Redis.
    pub timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::None,
            capacity: 1024,
            ttl_secs: None,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "repobridge".to_string(),
            timeout_ms: 250,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: CacheBackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn ttl_secs(mut self, secs: u64) -> Self {
        self.ttl_secs = Some(secs);
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
