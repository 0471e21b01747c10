//! The operations facade.

use crate::config::RepobridgeConfig;
use crate::loader::StoreLoader;
use repobridge_cache::{EntityCache, NoOpCache, build_cache_with_loader};
use repobridge_core::{Entity, Error, Expr, Result, Row, SelectQuery, Store, Value};
use repobridge_mapping::{MappingContext, PersistentEntity};
use repobridge_query::{
    DeleteBuilder, Example, InsertBuilder, InsertManyBuilder, Page, PageRequest, Sort,
    UpdateBuilder, apply_conditions, apply_example, apply_page, apply_sort, count_for_example,
    id_condition, ids_condition, select_for,
};
use repobridge_tx::{
    HostIsolation, HostTransactionManager, TransactionCoordinator, TransactionDefinition,
    TransactionHandle,
};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

/// Repository operations over a store, with entity models, an entity cache
/// and coordinated transactions.
///
/// Holds no state of its own beyond those references. Multi-entity writes
/// are not wrapped in a transaction implicitly; use `in_transaction` when
/// they must apply all-or-nothing.
pub struct Operations<S: Store, M: HostTransactionManager> {
    store: Arc<S>,
    mapping: Arc<MappingContext>,
    cache: Arc<dyn EntityCache>,
    tx: TransactionCoordinator<M, S>,
}

impl<S: Store, M: HostTransactionManager> fmt::Debug for Operations<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operations")
            .field("entities", &self.mapping.len())
            .field("cache", &self.cache.name())
            .finish_non_exhaustive()
    }
}

impl<S: Store, M: HostTransactionManager> Operations<S, M> {
    /// Operations without caching.
    pub fn new(store: Arc<S>, mapping: Arc<MappingContext>, manager: M) -> Self {
        let tx = TransactionCoordinator::new(manager, Arc::clone(&store));
        Self {
            store,
            mapping,
            cache: Arc::new(NoOpCache),
            tx,
        }
    }

    /// Build the mapping context and cache from configuration.
    ///
    /// An in-process cache reads through to `store` on a miss.
    pub fn from_config(store: Arc<S>, manager: M, config: &RepobridgeConfig) -> Result<Self>
    where
        S: 'static,
    {
        let mapping = Arc::new(MappingContext::new(config.mapping.clone()));
        let loader = StoreLoader::new(Arc::clone(&store), Arc::clone(&mapping));
        let cache = build_cache_with_loader(&config.cache, Some(Arc::new(loader)))?;
        Ok(Self::new(store, mapping, manager).with_cache(cache))
    }

    pub fn with_cache(mut self, cache: Arc<dyn EntityCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn mapping(&self) -> &Arc<MappingContext> {
        &self.mapping
    }

    pub fn cache(&self) -> &Arc<dyn EntityCache> {
        &self.cache
    }

    pub fn transactions(&self) -> &TransactionCoordinator<M, S> {
        &self.tx
    }

    /// The entity model of `E`, which must have an identifier.
    pub fn model<E: Entity>(&self) -> Result<Arc<PersistentEntity>> {
        self.mapping.get_aggregate_root::<E>()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Look an entity up by identifier, through the cache.
    ///
    /// A cache miss, an unavailable cache or an undecodable cached row all
    /// fall through to the store. Rows found in the store are cached.
    #[tracing::instrument(level = "debug", skip(self, id), fields(entity = E::NAME))]
    pub fn find_by_id<E: Entity>(&self, id: impl Into<Value>) -> Result<Option<E>> {
        let model = self.model::<E>()?;
        let key = model.cache_key(&id.into());
        id_condition(&model, &key)?;
        let region = model.cache_region();

        if let Some(row) = self.cache.get(region, &key) {
            match E::from_row(&row) {
                Ok(entity) => {
                    tracing::debug!(entity = E::NAME, key = %key, "Cache hit");
                    return Ok(Some(entity));
                }
                Err(e) => {
                    tracing::warn!(
                        target: "repobridge::cache",
                        entity = E::NAME,
                        error = %e,
                        "Cached row no longer converts, dropping it"
                    );
                    self.cache.invalidate(region, &key);
                }
            }
        }

        let id = model.require_single_id()?;
        let Some(column) = id.storage_name() else {
            return Err(Error::configuration(model.name(), "identifier has no storage column"));
        };
        let Some(row) = self.store.find_by_key(model.table_name(), column, &key)? else {
            return Ok(None);
        };
        let row = model.to_property_row(row);
        let entity = E::from_row(&row)?;
        self.cache.put(region, &key, Some(row));
        Ok(Some(entity))
    }

    /// Every entity whose identifier is in `ids`.
    #[tracing::instrument(level = "debug", skip(self, ids), fields(entity = E::NAME))]
    pub fn find_all_by_id<E, I>(&self, ids: I) -> Result<Vec<E>>
    where
        E: Entity,
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let model = self.model::<E>()?;
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = select_for(&model).filter(ids_condition(&model, &ids)?);
        self.fetch(&model, &query)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(entity = E::NAME))]
    pub fn find_all<E: Entity>(&self) -> Result<Vec<E>> {
        let model = self.model::<E>()?;
        self.fetch(&model, &select_for(&model))
    }

    #[tracing::instrument(level = "debug", skip(self, sort), fields(entity = E::NAME))]
    pub fn find_all_sorted<E: Entity>(&self, sort: &Sort) -> Result<Vec<E>> {
        let model = self.model::<E>()?;
        let query = apply_sort(select_for(&model), &model, sort)?;
        self.fetch(&model, &query)
    }

    #[tracing::instrument(level = "debug", skip(self, page), fields(entity = E::NAME))]
    pub fn find_page<E: Entity>(&self, page: &PageRequest) -> Result<Page<E>> {
        let model = self.model::<E>()?;
        let query = apply_page(select_for(&model), &model, page)?;
        let total = self.store.count(&query.for_count())?;
        let content = self.fetch(&model, &query)?;
        Ok(Page::new(content, page.clone(), total))
    }

    #[tracing::instrument(level = "debug", skip(self, example), fields(entity = E::NAME))]
    pub fn find_by_example<E: Entity>(&self, example: &Example<E>) -> Result<Vec<E>> {
        let model = self.model::<E>()?;
        let query = apply_example(select_for(&model), &model, example)?;
        self.fetch(&model, &query)
    }

    /// The single entity matching `example`.
    ///
    /// More than one match is an error rather than an arbitrary pick.
    #[tracing::instrument(level = "debug", skip(self, example), fields(entity = E::NAME))]
    pub fn find_one_by_example<E: Entity>(&self, example: &Example<E>) -> Result<Option<E>> {
        let model = self.model::<E>()?;
        let query = apply_example(select_for(&model), &model, example)?.limit(2);
        let mut found = self.fetch(&model, &query)?;
        if found.len() > 1 {
            return Err(Error::Usage(format!(
                "example for `{}` matched more than one row",
                model.name()
            )));
        }
        Ok(found.pop())
    }

    #[tracing::instrument(level = "debug", skip(self, example, page), fields(entity = E::NAME))]
    pub fn find_page_by_example<E: Entity>(
        &self,
        example: &Example<E>,
        page: &PageRequest,
    ) -> Result<Page<E>> {
        let model = self.model::<E>()?;
        let filtered = apply_example(select_for(&model), &model, example)?;
        let query = apply_page(filtered, &model, page)?;
        let total = self.store.count(&query.for_count())?;
        let content = self.fetch(&model, &query)?;
        Ok(Page::new(content, page.clone(), total))
    }

    /// Entities matching every condition, optionally sorted.
    #[tracing::instrument(level = "debug", skip(self, conditions, sort), fields(entity = E::NAME))]
    pub fn find_where<E, I>(&self, conditions: I, sort: Option<&Sort>) -> Result<Vec<E>>
    where
        E: Entity,
        I: IntoIterator<Item = Expr>,
    {
        let model = self.model::<E>()?;
        let query = apply_conditions(select_for(&model), &model, conditions, sort)?;
        self.fetch(&model, &query)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(entity = E::NAME))]
    pub fn count<E: Entity>(&self) -> Result<u64> {
        let model = self.model::<E>()?;
        self.store.count(&SelectQuery::from(model.table_name()))
    }

    #[tracing::instrument(level = "debug", skip(self, example), fields(entity = E::NAME))]
    pub fn count_by_example<E: Entity>(&self, example: &Example<E>) -> Result<u64> {
        let model = self.model::<E>()?;
        self.store.count(&count_for_example(&model, example)?)
    }

    /// Whether an entity with this identifier exists. A cached entry
    /// answers without a store round trip.
    #[tracing::instrument(level = "debug", skip(self, id), fields(entity = E::NAME))]
    pub fn exists_by_id<E: Entity>(&self, id: impl Into<Value>) -> Result<bool> {
        let model = self.model::<E>()?;
        let key = model.cache_key(&id.into());
        let condition = id_condition(&model, &key)?;
        if self.cache.contains(model.cache_region(), &key) {
            return Ok(true);
        }
        let query = SelectQuery::from(model.table_name()).filter(condition);
        Ok(self.store.count(&query)? > 0)
    }

    #[tracing::instrument(level = "debug", skip(self, example), fields(entity = E::NAME))]
    pub fn exists_by_example<E: Entity>(&self, example: &Example<E>) -> Result<bool> {
        Ok(self.count_by_example(example)? > 0)
    }

    /// Raw query in the store's language. Rows keep their storage column names.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn query_raw(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.store.query_raw(sql, params)
    }

    fn fetch<E: Entity>(&self, model: &PersistentEntity, query: &SelectQuery) -> Result<Vec<E>> {
        let rows = self.store.select(query)?;
        tracing::debug!(table = model.table_name(), rows = rows.len(), "Fetched rows");
        rows.into_iter()
            .map(|row| E::from_row(&model.to_property_row(row)))
            .collect()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    #[tracing::instrument(level = "debug", skip(self, entity), fields(entity = E::NAME))]
    pub fn insert<E: Entity>(&self, entity: &E) -> Result<u64> {
        let model = self.model::<E>()?;
        let statement = InsertBuilder::new(&model, entity).build()?;
        let affected = self.store.insert(&statement)?;
        self.evict(&model, entity);
        tracing::info!(table = model.table_name(), affected, "Inserted");
        Ok(affected)
    }

    /// Insert all entities in one statement.
    #[tracing::instrument(level = "debug", skip(self, entities), fields(entity = E::NAME, count = entities.len()))]
    pub fn insert_all<E: Entity>(&self, entities: &[E]) -> Result<u64> {
        if entities.is_empty() {
            return Ok(0);
        }
        let model = self.model::<E>()?;
        let statement = InsertManyBuilder::new(&model, entities).build()?;
        let affected = self.store.insert(&statement)?;
        for entity in entities {
            self.evict(&model, entity);
        }
        tracing::info!(table = model.table_name(), affected, "Inserted batch");
        Ok(affected)
    }

    /// Update by identifier. Versioned entities only match their current
    /// version and have it incremented; zero affected rows means the row
    /// changed or disappeared in the meantime.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(entity = E::NAME))]
    pub fn update<E: Entity>(&self, entity: &E) -> Result<u64> {
        let model = self.model::<E>()?;
        let statement = UpdateBuilder::new(&model, entity).build()?;
        let affected = self.store.update(&statement)?;
        self.evict(&model, entity);
        tracing::info!(table = model.table_name(), affected, "Updated");
        Ok(affected)
    }

    #[tracing::instrument(level = "debug", skip(self, entities), fields(entity = E::NAME, count = entities.len()))]
    pub fn update_all<E: Entity>(&self, entities: &[E]) -> Result<u64> {
        let mut affected = 0;
        for entity in entities {
            affected += self.update(entity)?;
        }
        Ok(affected)
    }

    /// Insert, or overwrite every non-identifier column on conflict.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(entity = E::NAME))]
    pub fn upsert<E: Entity>(&self, entity: &E) -> Result<u64> {
        let model = self.model::<E>()?;
        let statement = InsertBuilder::new(&model, entity)
            .on_conflict_do_update(&[])
            .build()?;
        let affected = self.store.upsert(&statement)?;
        self.evict(&model, entity);
        tracing::info!(table = model.table_name(), affected, "Upserted");
        Ok(affected)
    }

    #[tracing::instrument(level = "debug", skip(self, entities), fields(entity = E::NAME, count = entities.len()))]
    pub fn upsert_all<E: Entity>(&self, entities: &[E]) -> Result<u64> {
        if entities.is_empty() {
            return Ok(0);
        }
        let model = self.model::<E>()?;
        let statement = InsertManyBuilder::new(&model, entities)
            .on_conflict_do_update(&[])
            .build()?;
        let affected = self.store.upsert(&statement)?;
        for entity in entities {
            self.evict(&model, entity);
        }
        tracing::info!(table = model.table_name(), affected, "Upserted batch");
        Ok(affected)
    }

    #[tracing::instrument(level = "debug", skip(self, entity), fields(entity = E::NAME))]
    pub fn delete<E: Entity>(&self, entity: &E) -> Result<u64> {
        let model = self.model::<E>()?;
        let statement = DeleteBuilder::from_entity(&model, entity)?.build();
        let affected = self.store.delete(&statement)?;
        self.evict(&model, entity);
        tracing::info!(table = model.table_name(), affected, "Deleted");
        Ok(affected)
    }

    #[tracing::instrument(level = "debug", skip(self, id), fields(entity = E::NAME))]
    pub fn delete_by_id<E: Entity>(&self, id: impl Into<Value>) -> Result<u64> {
        let model = self.model::<E>()?;
        let key = model.cache_key(&id.into());
        let statement = DeleteBuilder::by_id(&model, &key)?.build();
        let affected = self.store.delete(&statement)?;
        self.cache.invalidate(model.cache_region(), &key);
        tracing::info!(table = model.table_name(), affected, "Deleted by id");
        Ok(affected)
    }

    #[tracing::instrument(level = "debug", skip(self, entities), fields(entity = E::NAME, count = entities.len()))]
    pub fn delete_all<E: Entity>(&self, entities: &[E]) -> Result<u64> {
        let mut affected = 0;
        for entity in entities {
            affected += self.delete(entity)?;
        }
        Ok(affected)
    }

    /// Delete every row of `E`'s table and drop its cache region.
    #[tracing::instrument(level = "debug", skip(self), fields(entity = E::NAME))]
    pub fn delete_all_of_type<E: Entity>(&self) -> Result<u64> {
        let model = self.model::<E>()?;
        let affected = self.store.delete(&DeleteBuilder::new(&model).build())?;
        self.cache.invalidate_all(model.cache_region());
        tracing::info!(table = model.table_name(), affected, "Deleted all");
        Ok(affected)
    }

    /// Raw statement in the store's language. The affected entities are
    /// unknown, so the whole cache is cleared.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn execute_raw(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let affected = self.store.execute_raw(sql, params)?;
        self.cache.clear();
        Ok(affected)
    }

    /// Drop the cache entry of `entity`, if it has a single non-null identifier.
    fn evict<E: Entity>(&self, model: &PersistentEntity, entity: &E) {
        let Some(id) = model.id_property() else {
            return;
        };
        let key = model.cache_key(&entity.value_of(id.name()));
        if !key.is_null() {
            self.cache.invalidate(model.cache_region(), &key);
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Run `work` against these operations inside a transaction.
    ///
    /// `None` keeps the store's default isolation.
    pub fn in_transaction<T>(
        &self,
        isolation: Option<HostIsolation>,
        work: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let definition = TransactionDefinition::with_isolation(isolation.unwrap_or_default());
        self.in_transaction_with(&definition, |ops, _| work(ops))
    }

    /// Run `work` with direct access to the store inside a transaction.
    pub fn with_store<T>(
        &self,
        isolation: Option<HostIsolation>,
        work: impl FnOnce(&S) -> Result<T>,
    ) -> Result<T> {
        let definition = TransactionDefinition::with_isolation(isolation.unwrap_or_default());
        self.in_transaction_with(&definition, |ops, _| work(ops.store.as_ref()))
    }

    /// Run `work` inside a transaction described by `definition`.
    ///
    /// When the transaction does not commit, the cache is cleared: reads
    /// inside the scope may have cached rows that were rolled back.
    #[tracing::instrument(level = "debug", skip(self, definition, work), fields(name = definition.name.as_deref()))]
    pub fn in_transaction_with<T>(
        &self,
        definition: &TransactionDefinition,
        work: impl FnOnce(&Self, &mut TransactionHandle<M>) -> Result<T>,
    ) -> Result<T> {
        let rolled_back = Cell::new(false);
        let result = self.tx.execute(definition, |handle| {
            let result = work(self, handle);
            if handle.is_rollback_only() {
                rolled_back.set(true);
            }
            result
        });
        if result.is_err() || rolled_back.get() {
            tracing::debug!(cache = self.cache.name(), "Transaction did not commit, clearing cache");
            self.cache.clear();
        }
        result
    }
}
