//! Classified properties.

use crate::metadata::AnnotationCache;
use repobridge_core::{
    Annotation, AssociationInfo, AssociationKind, EntityDescriptor, MetadataKind, NamingStrategy,
    PropertyInfo, SqlType, Value,
};

/// Primary classification of a property.
///
/// The flags on `PersistentProperty` are independent; the kind is the first
/// of them to hold in the order id, transient, embedded, indexed,
/// association, version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Id,
    Transient,
    Embedded,
    Indexed,
    Association(AssociationKind),
    Version,
    Basic,
}

/// One property of an entity model, classified once at build time.
#[derive(Debug, Clone)]
pub struct PersistentProperty {
    name: &'static str,
    owner: &'static str,
    declared_by: EntityDescriptor,
    sql_type: SqlType,
    nullable: bool,
    is_id: bool,
    is_transient: bool,
    is_embedded: bool,
    index_name: Option<Option<&'static str>>,
    association: Option<AssociationInfo>,
    is_version: bool,
    kind: PropertyKind,
    storage_name: Option<String>,
    target: Option<fn() -> EntityDescriptor>,
}

impl PersistentProperty {
    /// Classify `info`, declared by `declared_by`, for the entity named `owner`.
    pub(crate) fn classify(
        owner: &'static str,
        declared_by: EntityDescriptor,
        info: &PropertyInfo,
        annotations: &AnnotationCache,
        naming: &dyn NamingStrategy,
    ) -> Self {
        let find = |kind| annotations.find_member_metadata(&declared_by, info.name, kind);

        let is_id = find(MetadataKind::Id).is_some();
        // An identifier is always stored.
        let is_transient = !is_id && find(MetadataKind::Transient).is_some();
        let is_embedded = find(MetadataKind::Embedded).is_some();
        let index_name = match find(MetadataKind::Indexed) {
            Some(Annotation::Indexed(name)) => Some(name),
            _ => None,
        };
        let association = match find(MetadataKind::Association) {
            Some(Annotation::Association(assoc)) => Some(assoc),
            _ => None,
        };
        let is_version = find(MetadataKind::Version).is_some();

        let kind = if is_id {
            PropertyKind::Id
        } else if is_transient {
            PropertyKind::Transient
        } else if is_embedded {
            PropertyKind::Embedded
        } else if index_name.is_some() {
            PropertyKind::Indexed
        } else if let Some(assoc) = association {
            PropertyKind::Association(assoc.kind)
        } else if is_version {
            PropertyKind::Version
        } else {
            PropertyKind::Basic
        };

        let storage_name = if is_transient {
            None
        } else if is_id {
            Some(info.name.to_string())
        } else if let Some(Annotation::Column(column)) = find(MetadataKind::Column) {
            Some(column.to_string())
        } else {
            Some(naming.storage_name(info.name))
        };

        Self {
            name: info.name,
            owner,
            declared_by,
            sql_type: info.sql_type,
            nullable: info.nullable,
            is_id,
            is_transient,
            is_embedded,
            index_name,
            association,
            is_version,
            kind,
            storage_name,
            target: info.target,
        }
    }

    /// Property name as seen by application code.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the entity this property belongs to.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Type in the hierarchy that declares this property.
    pub fn declared_by(&self) -> EntityDescriptor {
        self.declared_by
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }

    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn is_embedded(&self) -> bool {
        self.is_embedded
    }

    pub fn has_index(&self) -> bool {
        self.index_name.is_some()
    }

    /// Explicit index name, when the index was given one.
    pub fn index_name(&self) -> Option<&'static str> {
        self.index_name.flatten()
    }

    pub fn is_association(&self) -> bool {
        self.association.is_some()
    }

    pub fn association(&self) -> Option<&AssociationInfo> {
        self.association.as_ref()
    }

    pub fn is_version(&self) -> bool {
        self.is_version
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Resolved storage column; `None` for transient properties.
    pub fn storage_name(&self) -> Option<&str> {
        self.storage_name.as_deref()
    }

    /// Descriptor of the embedded or associated type, if declared.
    pub fn target(&self) -> Option<EntityDescriptor> {
        self.target.map(|describe| describe())
    }

    /// `value` in the one shape used to key caches for this property.
    pub fn cache_key(&self, value: &Value) -> Value {
        self.sql_type.canonical(value)
    }
}
