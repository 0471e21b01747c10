//! Entity contracts.
//!
//! `Mapped` carries the static metadata of a type (name, annotations,
//! property declarations, parent type). `Entity` adds the data side: turning an
//! instance into values and rebuilding one from a row. Value objects that are
//! only ever embedded implement `Mapped` alone.

use crate::annotation::Annotation;
use crate::error::Result;
use crate::property::PropertyInfo;
use crate::row::Row;
use crate::value::Value;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Static mapping metadata for a type.
pub trait Mapped: 'static {
    /// Entity name used for display, cache regions and the default table name.
    const NAME: &'static str;

    /// Type-level annotations.
    fn annotations() -> &'static [Annotation] {
        &[]
    }

    /// Properties declared directly on this type, in declaration order.
    fn properties() -> &'static [PropertyInfo];

    /// Parent type whose properties this type inherits.
    fn parent() -> Option<fn() -> EntityDescriptor> {
        None
    }

    /// Erased descriptor for this type.
    fn descriptor() -> EntityDescriptor
    where
        Self: Sized,
    {
        EntityDescriptor::of::<Self>()
    }
}

/// A mapped type that can be stored and loaded.
pub trait Entity: Mapped + Sized + Send + Sync {
    /// Current values keyed by property name.
    fn to_values(&self) -> Vec<(&'static str, Value)>;

    /// Rebuild an instance from a row keyed by property name.
    fn from_row(row: &Row) -> Result<Self>;

    /// Value of a single property, `Null` if the entity does not report it.
    fn value_of(&self, property: &str) -> Value {
        self.to_values()
            .into_iter()
            .find(|(name, _)| *name == property)
            .map_or(Value::Null, |(_, v)| v)
    }
}

/// Type-erased handle on a `Mapped` type.
///
/// Descriptors are cheap to copy and compare by `TypeId`.
#[derive(Clone, Copy)]
pub struct EntityDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    name: &'static str,
    annotations: fn() -> &'static [Annotation],
    properties: fn() -> &'static [PropertyInfo],
    parent: fn() -> Option<fn() -> EntityDescriptor>,
}

impl EntityDescriptor {
    /// Describe `T`.
    pub fn of<T: Mapped>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: T::NAME,
            annotations: T::annotations,
            properties: T::properties,
            parent: T::parent,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified Rust type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declared entity name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn annotations(&self) -> &'static [Annotation] {
        (self.annotations)()
    }

    /// Properties declared directly on this type.
    pub fn declared_properties(&self) -> &'static [PropertyInfo] {
        (self.properties)()
    }

    /// Descriptor of the parent type, if any.
    pub fn parent(&self) -> Option<EntityDescriptor> {
        (self.parent)().map(|describe| describe())
    }

    /// The type hierarchy from the root ancestor down to this type.
    ///
    /// A type that (indirectly) names itself as an ancestor stops the walk.
    pub fn lineage(&self) -> Vec<EntityDescriptor> {
        let mut chain = vec![*self];
        let mut current = self.parent();
        while let Some(parent) = current {
            if chain.iter().any(|d| d.type_id == parent.type_id) {
                break;
            }
            current = parent.parent();
            chain.push(parent);
        }
        chain.reverse();
        chain
    }
}

impl PartialEq for EntityDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityDescriptor {}

impl Hash for EntityDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlType;

    struct Base;
    impl Mapped for Base {
        const NAME: &'static str = "Base";
        fn properties() -> &'static [PropertyInfo] {
            static P: &[PropertyInfo] =
                &[PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id])];
            P
        }
    }

    struct Child;
    impl Mapped for Child {
        const NAME: &'static str = "Child";
        fn properties() -> &'static [PropertyInfo] {
            static P: &[PropertyInfo] = &[PropertyInfo::new("label", SqlType::Text)];
            P
        }
        fn parent() -> Option<fn() -> EntityDescriptor> {
            Some(Base::descriptor)
        }
    }

    #[test]
    fn test_descriptor_identity() {
        assert_eq!(Base::descriptor(), Base::descriptor());
        assert_ne!(Base::descriptor(), Child::descriptor());
        assert_eq!(Child::descriptor().name(), "Child");
    }

    #[test]
    fn test_lineage_root_first() {
        let names: Vec<_> = Child::descriptor()
            .lineage()
            .iter()
            .map(EntityDescriptor::name)
            .collect();
        assert_eq!(names, vec!["Base", "Child"]);
    }
}
