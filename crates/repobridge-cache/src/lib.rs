//! Entity cache backends for repobridge.
//!
//! Three backends share the `EntityCache` contract:
//!
//! - `NoOpCache` caches nothing and is the default.
//! - `InProcessCache` keeps a bounded LRU map per entity, optionally with a
//!   TTL and a read-through loader.
//! - `DistributedCache` stores JSON rows in a key-value service, Redis in
//!   production. An unreachable service degrades to cache misses.
//!
//! `build_cache` picks one from a `CacheConfig`.

mod cache;
mod config;
mod distributed;
mod in_process;

pub use cache::{EntityCache, NoOpCache};
pub use config::{CacheBackendKind, CacheConfig};
pub use distributed::{DistributedCache, KvBackend, RedisBackend};
pub use in_process::{CacheLoader, CacheStats, InProcessCache};

use repobridge_core::Result;
use std::sync::Arc;

/// Build the backend selected by `config`.
///
/// Only configuration problems fail here, such as a malformed Redis URL.
/// An unreachable Redis server is not an error: the cache connects lazily
/// and treats every failed call as a miss.
///
/// # Example
///
/// ```
/// use repobridge_cache::{build_cache, CacheBackendKind, CacheConfig};
///
/// let cache = build_cache(&CacheConfig::new().backend(CacheBackendKind::InProcess)).unwrap();
/// assert_eq!(cache.name(), "in_process");
/// ```
pub fn build_cache(config: &CacheConfig) -> Result<Arc<dyn EntityCache>> {
    build_cache_with_loader(config, None)
}

/// Like `build_cache`, with a loader the in-process backend reads through
/// on a miss. Other backends ignore the loader.
pub fn build_cache_with_loader(
    config: &CacheConfig,
    loader: Option<Arc<dyn CacheLoader>>,
) -> Result<Arc<dyn EntityCache>> {
    let cache: Arc<dyn EntityCache> = match config.backend {
        CacheBackendKind::None => Arc::new(NoOpCache),
        CacheBackendKind::InProcess => {
            let mut cache = InProcessCache::new(config.capacity);
            if let Some(ttl) = config.ttl() {
                cache = cache.with_ttl(ttl);
            }
            if let Some(loader) = loader {
                cache = cache.with_loader(loader);
            }
            Arc::new(cache)
        }
        CacheBackendKind::Distributed => {
            let backend = RedisBackend::open(&config.redis_url, config.timeout())?;
            let mut cache = DistributedCache::new(backend, config.key_prefix.clone());
            if let Some(ttl) = config.ttl() {
                cache = cache.with_ttl(ttl);
            }
            Arc::new(cache)
        }
    };
    tracing::info!(
        target: "repobridge::cache",
        backend = cache.name(),
        "Entity cache configured"
    );
    Ok(cache)
}
