//! The type -> entity model registry.

use crate::config::MappingConfig;
use crate::entity::PersistentEntity;
use crate::metadata::AnnotationCache;
use repobridge_core::{EntityDescriptor, Error, Mapped, NamingStrategy, Result};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Registry of entity models, one per mapped type.
///
/// Models are built on first request and kept for the lifetime of the
/// context. Building is pure, so when two threads race on the first request
/// for a type both may build a model, but only the first one inserted is kept
/// and both callers receive it.
#[derive(Debug)]
pub struct MappingContext {
    config: MappingConfig,
    naming: Arc<dyn NamingStrategy>,
    annotations: AnnotationCache,
    entities: RwLock<HashMap<TypeId, Arc<PersistentEntity>>>,
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::new(MappingConfig::default())
    }
}

impl MappingContext {
    pub fn new(config: MappingConfig) -> Self {
        let naming = config.naming.strategy();
        Self::with_naming(config, naming)
    }

    /// Use a custom naming strategy instead of the one selected by `config`.
    pub fn with_naming(config: MappingConfig, naming: Arc<dyn NamingStrategy>) -> Self {
        Self {
            config,
            naming,
            annotations: AnnotationCache::new(),
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide context with the default configuration.
    pub fn global() -> Arc<MappingContext> {
        static GLOBAL: OnceLock<Arc<MappingContext>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MappingContext::default())))
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn naming(&self) -> &dyn NamingStrategy {
        self.naming.as_ref()
    }

    pub fn annotations(&self) -> &AnnotationCache {
        &self.annotations
    }

    /// The model for `E`, building it on first request.
    pub fn get_or_create_entity_model<E: Mapped>(&self) -> Result<Arc<PersistentEntity>> {
        self.get_or_create(&E::descriptor())
    }

    /// The model for `E`, which must have an identifier.
    pub fn get_aggregate_root<E: Mapped>(&self) -> Result<Arc<PersistentEntity>> {
        let model = self.get_or_create_entity_model::<E>()?;
        model.require_aggregate_root()?;
        Ok(model)
    }

    /// The model for the described type, building it on first request.
    ///
    /// With type exploration on, every embedded and association target
    /// reachable from the type is built too. Nothing is registered unless all
    /// of them build, so a configuration error leaves the context unchanged.
    #[tracing::instrument(level = "debug", skip(self), fields(entity = descriptor.name()))]
    pub fn get_or_create(&self, descriptor: &EntityDescriptor) -> Result<Arc<PersistentEntity>> {
        if let Some(model) = self.lookup(descriptor.type_id()) {
            return Ok(model);
        }

        let mut pending = vec![self.build(*descriptor)?];
        if self.config.explore_property_types {
            let mut seen = HashSet::from([descriptor.type_id()]);
            let mut next = 0;
            while next < pending.len() {
                let targets: Vec<EntityDescriptor> = pending[next]
                    .properties()
                    .iter()
                    .filter(|p| p.is_embedded() || p.is_association())
                    .filter_map(|p| p.target())
                    .collect();
                next += 1;
                for target in targets {
                    if seen.insert(target.type_id()) && !self.contains(&target) {
                        pending.push(self.build(target)?);
                    }
                }
            }
        }

        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        let mut owner = None;
        for built in pending {
            let type_id = built.descriptor().type_id();
            let model = entities
                .entry(type_id)
                .or_insert_with(|| {
                    tracing::debug!(
                        entity = built.name(),
                        table = built.table_name(),
                        properties = built.properties().len(),
                        "Entity model built"
                    );
                    Arc::new(built)
                })
                .clone();
            owner.get_or_insert(model);
        }
        owner.ok_or_else(|| Error::configuration(descriptor.name(), "entity model was not built"))
    }

    fn build(&self, descriptor: EntityDescriptor) -> Result<PersistentEntity> {
        PersistentEntity::build(descriptor, &self.annotations, self.naming.as_ref())
    }

    fn lookup(&self, type_id: TypeId) -> Option<Arc<PersistentEntity>> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned()
    }

    /// True if a model for the described type has been built.
    pub fn contains(&self, descriptor: &EntityDescriptor) -> bool {
        self.lookup(descriptor.type_id()).is_some()
    }

    /// The registered model whose cache region is `region`.
    pub fn model_for_region(&self, region: &str) -> Option<Arc<PersistentEntity>> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|model| model.cache_region() == region)
            .cloned()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered model, ordered by name.
    pub fn entities(&self) -> Vec<Arc<PersistentEntity>> {
        let mut all: Vec<_> = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }
}
