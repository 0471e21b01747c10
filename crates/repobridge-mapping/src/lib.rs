//! Entity metadata for repobridge.
//!
//! `repobridge-mapping` turns the static declarations of `Mapped` types into
//! classified, immutable entity models and keeps them in a `MappingContext`.
//!
//! # Role In The Architecture
//!
//! - **Annotation cache**: memoised (type, member, kind) lookups over declarative metadata.
//! - **Property model**: each declared property classified once (id, transient,
//!   embedded, indexed, association, version) with its resolved storage column.
//! - **Entity model**: the ordered, inherited property set plus derived views
//!   (identifier, embedded, indexed properties).
//! - **Mapping context**: the thread-safe type -> model registry.
//!
//! # Example
//!
//! ```
//! use repobridge_core::{Annotation, Mapped, PropertyInfo, SqlType};
//! use repobridge_mapping::MappingContext;
//!
//! struct Tag;
//! impl Mapped for Tag {
//!     const NAME: &'static str = "Tag";
//!     fn properties() -> &'static [PropertyInfo] {
//!         static P: &[PropertyInfo] = &[
//!             PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
//!             PropertyInfo::new("label", SqlType::Text),
//!         ];
//!         P
//!     }
//! }
//!
//! let ctx = MappingContext::default();
//! let tag = ctx.get_aggregate_root::<Tag>().unwrap();
//! assert_eq!(tag.id_property().unwrap().name(), "id");
//! ```

pub mod config;
pub mod context;
pub mod entity;
pub mod metadata;
pub mod property;

#[cfg(test)]
mod fixtures;

pub use config::MappingConfig;
pub use context::MappingContext;
pub use entity::{CompositeIndex, PersistentEntity};
pub use metadata::AnnotationCache;
pub use property::{PersistentProperty, PropertyKind};
