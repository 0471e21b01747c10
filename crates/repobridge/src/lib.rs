//! repobridge: repositories over an object/relational store.
//!
//! `repobridge` is the **primary user-facing crate**. It ties the workspace
//! together behind `Operations`:
//!
//! - `repobridge-mapping` builds and caches one `PersistentEntity` per type.
//! - `repobridge-query` translates `Sort`, `PageRequest`, `Example` and
//!   condition lists into the store's `SelectQuery`, and entities into
//!   write statements.
//! - `repobridge-cache` answers `find_by_id` from an entity cache that is
//!   invalidated on every write.
//! - `repobridge-tx` keeps the host transaction and the store's native
//!   transaction in step for `in_transaction`.
//!
//! # Example
//!
//! ```ignore
//! use repobridge::prelude::*;
//!
//! let ops = Operations::from_config(store, host_manager, &RepobridgeConfig::default())?;
//! let page = ops.find_page::<User>(
//!     &PageRequest::of(2, 20)?.with_sort(Sort::by(["lastName", "firstName"])),
//! )?;
//! ops.in_transaction(Some(HostIsolation::RepeatableRead), |ops| {
//!     ops.update(&user)?;
//!     ops.delete_by_id::<Session>(session_id)
//! })?;
//! ```

mod config;
mod loader;
mod operations;

pub use config::RepobridgeConfig;
pub use loader::StoreLoader;
pub use operations::Operations;

pub use repobridge_cache::{
    CacheBackendKind, CacheConfig, CacheLoader, CacheStats, DistributedCache, EntityCache,
    InProcessCache, KvBackend, NoOpCache, RedisBackend, build_cache, build_cache_with_loader,
};
pub use repobridge_core::{
    Annotation, AssociationKind, Entity, EntityDescriptor, Error, Expr, IsolationLevel, Mapped,
    MetadataKind, NamingStrategy, NamingStrategyKind, NativeTransaction, PropertyInfo, Result,
    Row, SelectQuery, SqlType, Store, Value,
};
pub use repobridge_mapping::{
    MappingConfig, MappingContext, PersistentEntity, PersistentProperty, PropertyKind,
};
pub use repobridge_query::{
    Direction, Example, ExampleMatcher, NullHandler, NullHandling, Order, Page, PageRequest, Sort,
    StringMatcher,
};
pub use repobridge_tx::{
    HostIsolation, HostTransactionManager, Propagation, TransactionCoordinator,
    TransactionDefinition, TransactionHandle, TransactionState,
};

/// Everything a repository implementation usually needs.
pub mod prelude {
    pub use crate::{
        Annotation, AssociationKind, Direction, Entity, Error, Example, ExampleMatcher, Expr,
        HostIsolation, HostTransactionManager, Mapped, MappingContext, Operations, Order, Page,
        PageRequest, PropertyInfo, RepobridgeConfig, Result, Row, Sort, SqlType, Store,
        StringMatcher, TransactionDefinition, Value,
    };
}
