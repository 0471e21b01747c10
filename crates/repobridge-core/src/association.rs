//! Association metadata.
//!
//! Associations are declared statically on each property (see `Annotation::Association`)
//! so the mapping layer can classify them without runtime reflection.

use serde::{Deserialize, Serialize};

/// Cardinality of an association between two entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// One-to-one: `User` has one `Profile`.
    OneToOne,
    /// Many-to-one: many `Order`s belong to one `Customer`.
    #[default]
    ManyToOne,
    /// One-to-many: one `Customer` has many `Order`s.
    OneToMany,
    /// Many-to-many: `User`s have many `Role`s via a link table.
    ManyToMany,
}

impl AssociationKind {
    /// True if the owning side holds a collection.
    pub const fn is_collection(self) -> bool {
        matches!(self, AssociationKind::OneToMany | AssociationKind::ManyToMany)
    }
}

/// Metadata about one association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssociationInfo {
    /// Cardinality.
    pub kind: AssociationKind,
    /// Property on the target entity that owns the inverse side.
    pub mapped_by: Option<&'static str>,
    /// Whether deletes cascade to the target.
    pub cascade_delete: bool,
    /// Whether the target is loaded lazily.
    pub lazy: bool,
}

impl AssociationInfo {
    /// Create association metadata of the given kind.
    #[must_use]
    pub const fn new(kind: AssociationKind) -> Self {
        Self {
            kind,
            mapped_by: None,
            cascade_delete: false,
            lazy: false,
        }
    }

    /// Set the inverse property name.
    #[must_use]
    pub const fn mapped_by(mut self, property: &'static str) -> Self {
        self.mapped_by = Some(property);
        self
    }

    /// Enable/disable cascade delete.
    #[must_use]
    pub const fn cascade_delete(mut self, value: bool) -> Self {
        self.cascade_delete = value;
        self
    }

    /// Enable/disable lazy loading.
    #[must_use]
    pub const fn lazy(mut self, value: bool) -> Self {
        self.lazy = value;
        self
    }
}
