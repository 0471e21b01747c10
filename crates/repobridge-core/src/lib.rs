//! Core types and collaborator contracts for repobridge.
//!
//! `repobridge-core` is the **foundation layer** of the workspace. It defines the
//! data types and traits every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Mapping contracts**: `Mapped`/`Entity` are implemented by domain types and
//!   expose their declarative metadata (`Annotation`, `PropertyInfo`).
//! - **Data model**: `Row`, `Value` and `SqlType` carry values between the store,
//!   the cache and entities.
//! - **Store contracts**: `Store` and `NativeTransaction` describe what the
//!   underlying object/relational mapper must provide, and `SelectQuery`, `Expr`
//!   and the statement types are its native query vocabulary.
//!
//! # Who Uses This Crate
//!
//! - `repobridge-mapping` classifies `PropertyInfo` declarations into entity models.
//! - `repobridge-query` translates sort/page/example descriptors into `SelectQuery`.
//! - `repobridge-cache` stores `Row`s keyed by identifier `Value`s.
//! - `repobridge-tx` drives `NativeTransaction` next to the host transaction manager.
//!
//! Most applications should use the `repobridge` facade; reach for this crate
//! directly when implementing a `Store`.

pub mod annotation;
pub mod association;
pub mod entity;
pub mod error;
pub mod expr;
pub mod naming;
pub mod property;
pub mod query;
pub mod row;
pub mod store;
pub mod types;
pub mod value;

pub use annotation::{Annotation, MetadataKind};
pub use association::{AssociationInfo, AssociationKind};
pub use entity::{Entity, EntityDescriptor, Mapped};
pub use error::{Error, Result, TranslationError, TranslationErrorKind, TxPhase};
pub use expr::{ColumnRef, CompareOp, Direction, Expr, NullHandling, OrderExpr};
pub use naming::{CamelCase, NamingStrategy, NamingStrategyKind, SnakeCase, UpperSnakeCase, Verbatim};
pub use property::PropertyInfo;
pub use query::{DeleteStatement, InsertStatement, OnConflict, SelectQuery, UpdateStatement};
pub use row::Row;
pub use store::{IsolationLevel, NativeTransaction, Store};
pub use types::SqlType;
pub use value::{Value, hash_value, hash_values};
