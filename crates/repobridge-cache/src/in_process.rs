//! In-process LRU backend.

use crate::cache::EntityCache;
use lru::LruCache;
use repobridge_core::{Result, Row, Value};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Fetches a row on a cache miss.
pub trait CacheLoader: Send + Sync {
    fn load(&self, region: &str, key: &Value) -> Result<Option<Row>>;
}

/// Counters for an `InProcessCache`.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Rows fetched through the loader.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn load_failures(&self) -> u64 {
        self.load_failures.load(Ordering::Relaxed)
    }

    /// Entries dropped for capacity or expiry.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct Entry {
    row: Row,
    stored_at: Instant,
}

type Region = Mutex<LruCache<String, Entry>>;

/// Bounded per-entity LRU maps, created on first use of each entity.
pub struct InProcessCache {
    capacity: NonZeroUsize,
    ttl: Option<Duration>,
    regions: RwLock<HashMap<String, Arc<Region>>>,
    loader: Option<Arc<dyn CacheLoader>>,
    stats: CacheStats,
}

impl std::fmt::Debug for InProcessCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("loader", &self.loader.is_some())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl InProcessCache {
    /// A cache holding up to `capacity` entries per entity; zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            ttl: None,
            regions: RwLock::new(HashMap::new()),
            loader: None,
            stats: CacheStats::default(),
        }
    }

    /// Expire entries `ttl` after they were stored.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Read through `loader` on a miss.
    pub fn with_loader(mut self, loader: Arc<dyn CacheLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of entries in one region.
    pub fn region_len(&self, region: &str) -> usize {
        self.existing_region(region)
            .map_or(0, |r| r.lock().unwrap_or_else(PoisonError::into_inner).len())
    }

    fn existing_region(&self, region: &str) -> Option<Arc<Region>> {
        self.regions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(region)
            .cloned()
    }

    fn region(&self, region: &str) -> Arc<Region> {
        if let Some(found) = self.existing_region(region) {
            return found;
        }
        let mut regions = self.regions.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(regions.entry(region.to_string()).or_insert_with(|| {
            tracing::debug!(target: "repobridge::cache", region, capacity = self.capacity.get(), "Cache region created");
            Arc::new(Mutex::new(LruCache::new(self.capacity)))
        }))
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl.is_some_and(|ttl| entry.stored_at.elapsed() >= ttl)
    }

    /// Look up without touching the loader.
    fn lookup(&self, region: &Region, key: &str) -> Option<Row> {
        let mut entries = region.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry) => return Some(entry.row.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        None
    }

    fn insert(&self, region: &Region, key: String, row: Row) {
        let mut entries = region.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = Entry {
            row,
            stored_at: Instant::now(),
        };
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl EntityCache for InProcessCache {
    fn name(&self) -> &'static str {
        "in_process"
    }

    fn get(&self, region_name: &str, key: &Value) -> Option<Row> {
        let region = self.region(region_name);
        let key_string = key.key_string();
        if let Some(row) = self.lookup(&region, &key_string) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(row);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        let loader = self.loader.as_ref()?;
        match loader.load(region_name, key) {
            Ok(Some(row)) => {
                self.stats.loads.fetch_add(1, Ordering::Relaxed);
                self.insert(&region, key_string, row.clone());
                Some(row)
            }
            Ok(None) => None,
            Err(e) => {
                self.stats.load_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: "repobridge::cache",
                    region = region_name,
                    key = %key,
                    error = %e,
                    "Cache loader failed, treating as miss"
                );
                None
            }
        }
    }

    fn store(&self, region: &str, key: &Value, row: Row) {
        self.insert(&self.region(region), key.key_string(), row);
    }

    fn contains(&self, region: &str, key: &Value) -> bool {
        self.existing_region(region)
            .is_some_and(|r| self.lookup(&r, &key.key_string()).is_some())
    }

    fn invalidate(&self, region: &str, key: &Value) {
        if let Some(r) = self.existing_region(region) {
            r.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop(&key.key_string());
        }
    }

    fn invalidate_all(&self, region: &str) {
        if let Some(r) = self.existing_region(region) {
            r.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    fn clear(&self) {
        let regions = self.regions.read().unwrap_or_else(PoisonError::into_inner);
        for region in regions.values() {
            region.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use repobridge_core::Error;
    use std::sync::Barrier;

    fn row(id: i64, name: &str) -> Row {
        Row::from_pairs(vec![("id", Value::BigInt(id)), ("name", Value::from(name))])
    }

    #[test]
    fn test_put_get_invalidate() {
        let cache = InProcessCache::new(10);
        let key = Value::BigInt(1);
        cache.put("User", &key, Some(row(1, "ada")));
        assert_eq!(cache.get("User", &key), Some(row(1, "ada")));
        assert!(cache.contains("User", &key));
        assert!(!cache.contains("Order", &key));
        cache.invalidate("User", &key);
        assert_eq!(cache.get("User", &key), None);
    }

    #[test]
    fn test_put_none_invalidates() {
        let cache = InProcessCache::new(10);
        let key = Value::BigInt(1);
        cache.put("User", &key, Some(row(1, "ada")));
        cache.put("User", &key, None);
        assert_eq!(cache.get("User", &key), None);
        assert_eq!(cache.region_len("User"), 0);
    }

    #[test]
    fn test_integer_widths_share_entries() {
        let cache = InProcessCache::new(10);
        cache.put("User", &Value::Int(7), Some(row(7, "x")));
        assert!(cache.contains("User", &Value::BigInt(7)));
    }

    #[test]
    fn test_capacity_is_per_region() {
        let cache = InProcessCache::new(2);
        for id in 0..3 {
            cache.put("User", &Value::BigInt(id), Some(row(id, "u")));
        }
        cache.put("Order", &Value::BigInt(0), Some(row(0, "o")));
        assert_eq!(cache.region_len("User"), 2);
        assert!(!cache.contains("User", &Value::BigInt(0)));
        assert_eq!(cache.region_len("Order"), 1);
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = InProcessCache::new(4).with_ttl(Duration::ZERO);
        cache.put("User", &Value::BigInt(1), Some(row(1, "a")));
        assert_eq!(cache.get("User", &Value::BigInt(1)), None);
    }

    #[test]
    fn test_invalidate_all_and_clear() {
        let cache = InProcessCache::new(4);
        cache.put("User", &Value::BigInt(1), Some(row(1, "a")));
        cache.put("Order", &Value::BigInt(1), Some(row(1, "o")));
        cache.invalidate_all("User");
        assert_eq!(cache.region_len("User"), 0);
        assert_eq!(cache.region_len("Order"), 1);
        cache.clear();
        assert_eq!(cache.region_len("Order"), 0);
    }

    struct Loader;
    impl CacheLoader for Loader {
        fn load(&self, _region: &str, key: &Value) -> Result<Option<Row>> {
            match key.as_i64() {
                Some(13) => Err(Error::store("connection reset")),
                Some(id) if id > 0 => Ok(Some(row(id, "loaded"))),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_read_through_loader() {
        let cache = InProcessCache::new(4).with_loader(Arc::new(Loader));
        assert_eq!(cache.get("User", &Value::BigInt(3)), Some(row(3, "loaded")));
        assert!(cache.contains("User", &Value::BigInt(3)));
        assert_eq!(cache.get("User", &Value::BigInt(0)), None);
        assert_eq!(cache.get("User", &Value::BigInt(13)), None);
        assert_eq!(cache.stats().loads(), 1);
        assert_eq!(cache.stats().load_failures(), 1);
        assert_eq!(cache.get("User", &Value::BigInt(3)), Some(row(3, "loaded")));
        assert_eq!(cache.stats().hits(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        const THREADS: usize = 8;
        let cache = InProcessCache::new(64);
        let barrier = Barrier::new(THREADS);
        std::thread::scope(|s| {
            for t in 0..THREADS {
                let cache = &cache;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    for i in 0..50i64 {
                        let key = Value::BigInt(i);
                        cache.put("User", &key, Some(row(i, "t")));
                        let _ = cache.get("User", &key);
                        if (i + t as i64) % 3 == 0 {
                            cache.invalidate("User", &key);
                        }
                    }
                });
            }
        });
        assert!(cache.region_len("User") <= 64);
    }

    proptest! {
        #[test]
        fn invalidate_is_idempotent(keys in prop::collection::vec(0i64..20, 0..40), target in 0i64..20) {
            let cache = InProcessCache::new(32);
            for k in &keys {
                cache.put("User", &Value::BigInt(*k), Some(row(*k, "p")));
            }
            let key = Value::BigInt(target);
            cache.invalidate("User", &key);
            cache.invalidate("User", &key);
            prop_assert_eq!(cache.get("User", &key), None);
        }

        #[test]
        fn put_none_equals_invalidate(k in 0i64..100, present in any::<bool>()) {
            let cache = InProcessCache::new(8);
            let key = Value::BigInt(k);
            if present {
                cache.put("User", &key, Some(row(k, "p")));
            }
            cache.put("User", &key, None);
            prop_assert!(!cache.contains("User", &key));
            prop_assert_eq!(cache.get("User", &key), None);
        }
    }
}
