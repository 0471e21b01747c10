//! Read-through loading from the store.

use repobridge_cache::CacheLoader;
use repobridge_core::{Error, Result, Row, Store, Value};
use repobridge_mapping::MappingContext;
use std::sync::Arc;

/// Loads cache misses from the store by identifier.
///
/// Regions resolve through the mapping context, so only types whose model
/// has been built can be loaded. Rows come back keyed by property name, the
/// same shape `Operations` caches.
pub struct StoreLoader<S> {
    store: Arc<S>,
    mapping: Arc<MappingContext>,
}

impl<S: Store> StoreLoader<S> {
    pub fn new(store: Arc<S>, mapping: Arc<MappingContext>) -> Self {
        Self { store, mapping }
    }
}

impl<S: Store> CacheLoader for StoreLoader<S> {
    fn load(&self, region: &str, key: &Value) -> Result<Option<Row>> {
        let Some(model) = self.mapping.model_for_region(region) else {
            tracing::debug!(target: "repobridge::cache", region, "No entity model for region");
            return Ok(None);
        };
        let id = model.require_single_id()?;
        let column = id
            .storage_name()
            .ok_or_else(|| Error::configuration(model.name(), "identifier has no storage column"))?;
        let key = id.cache_key(key);
        let row = self.store.find_by_key(model.table_name(), column, &key)?;
        Ok(row.map(|row| model.to_property_row(row)))
    }
}
