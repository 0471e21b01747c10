//! Declarative mapping metadata.
//!
//! An `Annotation` is a marker attached either to an entity type or to one of
//! its properties. Entities declare their annotations as `'static` slices, so
//! reading them is cheap, but classifying a whole type still means scanning
//! every slice; the mapping crate memoises those scans per (type, kind).

use crate::association::{AssociationInfo, AssociationKind};
use std::fmt;

/// A single piece of declarative metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// Type level: explicit storage table name.
    Table(&'static str),
    /// Type level: display name overriding the entity name.
    DisplayName(&'static str),
    /// Type level, repeatable: a named index spanning several properties.
    CompositeIndex {
        name: &'static str,
        properties: &'static [&'static str],
    },
    /// Member level: identifier property.
    Id,
    /// Member level: not stored.
    Transient,
    /// Member level: value object stored inline.
    Embedded,
    /// Member level: indexed, with an optional index name.
    Indexed(Option<&'static str>),
    /// Member level: reference to another entity.
    Association(AssociationInfo),
    /// Member level: optimistic-locking version counter.
    Version,
    /// Member level: explicit storage column name.
    Column(&'static str),
}

impl Annotation {
    /// The kind of this annotation.
    pub const fn kind(&self) -> MetadataKind {
        match self {
            Annotation::Table(_) => MetadataKind::Table,
            Annotation::DisplayName(_) => MetadataKind::DisplayName,
            Annotation::CompositeIndex { .. } => MetadataKind::CompositeIndex,
            Annotation::Id => MetadataKind::Id,
            Annotation::Transient => MetadataKind::Transient,
            Annotation::Embedded => MetadataKind::Embedded,
            Annotation::Indexed(_) => MetadataKind::Indexed,
            Annotation::Association(_) => MetadataKind::Association,
            Annotation::Version => MetadataKind::Version,
            Annotation::Column(_) => MetadataKind::Column,
        }
    }

    /// Shorthand for an association annotation of the given kind.
    pub const fn association(kind: AssociationKind) -> Self {
        Annotation::Association(AssociationInfo::new(kind))
    }
}

/// Discriminant of `Annotation`, used as a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataKind {
    Table,
    DisplayName,
    CompositeIndex,
    Id,
    Transient,
    Embedded,
    Indexed,
    Association,
    Version,
    Column,
}

impl MetadataKind {
    /// Every kind, in declaration order.
    pub const ALL: [MetadataKind; 10] = [
        MetadataKind::Table,
        MetadataKind::DisplayName,
        MetadataKind::CompositeIndex,
        MetadataKind::Id,
        MetadataKind::Transient,
        MetadataKind::Embedded,
        MetadataKind::Indexed,
        MetadataKind::Association,
        MetadataKind::Version,
        MetadataKind::Column,
    ];

    /// Kinds that may appear more than once on the same target.
    pub const fn is_repeatable(self) -> bool {
        matches!(self, MetadataKind::CompositeIndex)
    }

    /// Kinds meaningful on an entity type.
    pub const fn applies_to_type(self) -> bool {
        matches!(
            self,
            MetadataKind::Table | MetadataKind::DisplayName | MetadataKind::CompositeIndex
        )
    }

    /// Kinds meaningful on a property.
    pub const fn applies_to_member(self) -> bool {
        !self.applies_to_type()
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
