//! Configuration for a whole `Operations` instance.

use repobridge_cache::CacheConfig;
use repobridge_mapping::MappingConfig;
use serde::Deserialize;

/// Mapping and cache settings, loadable from JSON.
///
/// # Example
///
/// ```
/// use repobridge::RepobridgeConfig;
///
/// let config: RepobridgeConfig = serde_json::from_str(
///     r#"{"mapping":{"naming":"snake_case"},"cache":{"backend":"in_process","capacity":64}}"#,
/// )
/// .unwrap();
/// assert_eq!(config.cache.capacity, 64);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepobridgeConfig {
    pub mapping: MappingConfig,
    pub cache: CacheConfig,
}

impl RepobridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapping(mut self, mapping: MappingConfig) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
