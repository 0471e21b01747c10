//! Property declarations.

use crate::annotation::{Annotation, MetadataKind};
use crate::entity::EntityDescriptor;
use crate::types::SqlType;

/// Static declaration of one property of an entity.
///
/// Declarations are `const`-constructible so entities can expose them from a
/// `static` slice:
///
/// ```
/// use repobridge_core::{Annotation, PropertyInfo, SqlType};
///
/// static PROPERTIES: &[PropertyInfo] = &[
///     PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
///     PropertyInfo::new("email", SqlType::Text).with(&[Annotation::Indexed(None)]),
///     PropertyInfo::new("created_at", SqlType::Timestamp).with(&[Annotation::Transient]),
/// ];
/// assert_eq!(PROPERTIES.len(), 3);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PropertyInfo {
    /// Property name as seen by application code.
    pub name: &'static str,
    /// Declared storage type.
    pub sql_type: SqlType,
    /// Whether the property may hold `Null`.
    pub nullable: bool,
    /// Declarative markers on this property.
    pub annotations: &'static [Annotation],
    /// Describes the property's own type when it is an embedded value or an association target.
    pub target: Option<fn() -> EntityDescriptor>,
}

impl PropertyInfo {
    /// Create a plain property with no annotations.
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            annotations: &[],
            target: None,
        }
    }

    /// Attach declarative markers.
    pub const fn with(mut self, annotations: &'static [Annotation]) -> Self {
        self.annotations = annotations;
        self
    }

    /// Set the nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Point at the descriptor of the property's type.
    pub const fn target(mut self, describe: fn() -> EntityDescriptor) -> Self {
        self.target = Some(describe);
        self
    }

    /// First annotation of the given kind, if any.
    pub fn annotation(&self, kind: MetadataKind) -> Option<&'static Annotation> {
        self.annotations.iter().find(|a| a.kind() == kind)
    }

    /// True if an annotation of the given kind is present.
    pub fn has(&self, kind: MetadataKind) -> bool {
        self.annotation(kind).is_some()
    }
}
