//! Entity models.

use crate::metadata::AnnotationCache;
use crate::property::PersistentProperty;
use repobridge_core::{
    Annotation, EntityDescriptor, Error, MetadataKind, NamingStrategy, Result, Row, Value,
};
use std::collections::HashMap;

/// A named index spanning several properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeIndex {
    pub name: &'static str,
    /// Storage columns, in declaration order.
    pub columns: Vec<String>,
}

/// The classified, immutable model of one entity type.
///
/// Properties appear in hierarchy order: everything declared by the root
/// ancestor first, then each subtype's additions. A subtype that redeclares a
/// property replaces the inherited declaration at the inherited position.
#[derive(Debug)]
pub struct PersistentEntity {
    descriptor: EntityDescriptor,
    name: String,
    table_name: String,
    properties: Vec<PersistentProperty>,
    by_name: HashMap<&'static str, usize>,
    by_column: HashMap<String, usize>,
    composite_indexes: Vec<CompositeIndex>,
}

impl PersistentEntity {
    /// Build the model for `descriptor`.
    pub(crate) fn build(
        descriptor: EntityDescriptor,
        annotations: &AnnotationCache,
        naming: &dyn NamingStrategy,
    ) -> Result<Self> {
        let entity_name = descriptor.name();
        let mut properties: Vec<PersistentProperty> = Vec::new();
        let mut by_name: HashMap<&'static str, usize> = HashMap::new();

        for declaring in descriptor.lineage() {
            for info in declaring.declared_properties() {
                let property = PersistentProperty::classify(
                    entity_name,
                    declaring,
                    info,
                    annotations,
                    naming,
                );
                match by_name.get(info.name) {
                    Some(&slot) => properties[slot] = property,
                    None => {
                        by_name.insert(info.name, properties.len());
                        properties.push(property);
                    }
                }
            }
        }

        let mut by_column: HashMap<String, usize> = HashMap::new();
        let mut version: Option<&'static str> = None;
        for (slot, property) in properties.iter().enumerate() {
            if property.is_version() {
                if property.is_transient() {
                    return Err(Error::configuration(
                        entity_name,
                        format!("version property `{}` cannot be transient", property.name()),
                    ));
                }
                if let Some(first) = version {
                    return Err(Error::configuration(
                        entity_name,
                        format!(
                            "more than one version property: `{first}` and `{}`",
                            property.name()
                        ),
                    ));
                }
                version = Some(property.name());
            }
            if let Some(column) = property.storage_name() {
                if let Some(&other) = by_column.get(column) {
                    return Err(Error::configuration(
                        entity_name,
                        format!(
                            "properties `{}` and `{}` both map to column `{column}`",
                            properties[other].name(),
                            property.name()
                        ),
                    ));
                }
                by_column.insert(column.to_string(), slot);
            }
        }

        let name = match annotations.find_metadata(&descriptor, MetadataKind::DisplayName) {
            Some(Annotation::DisplayName(display)) => display.to_string(),
            _ => match annotations.find_metadata(&descriptor, MetadataKind::Table) {
                Some(Annotation::Table(table)) => table.to_string(),
                _ => entity_name.to_string(),
            },
        };
        let table_name = match annotations.find_metadata(&descriptor, MetadataKind::Table) {
            Some(Annotation::Table(table)) => table.to_string(),
            _ => naming.storage_name(entity_name),
        };

        let mut composite_indexes = Vec::new();
        for annotation in
            annotations.find_repeatable_metadata(&descriptor, MetadataKind::CompositeIndex)
        {
            let Annotation::CompositeIndex {
                name: index,
                properties: members,
            } = annotation
            else {
                continue;
            };
            let mut columns = Vec::with_capacity(members.len());
            for member in members {
                let column = by_name
                    .get(member)
                    .and_then(|&slot| properties[slot].storage_name())
                    .ok_or_else(|| {
                        Error::configuration(
                            entity_name,
                            format!("index `{index}` names unknown or transient property `{member}`"),
                        )
                    })?;
                columns.push(column.to_string());
            }
            composite_indexes.push(CompositeIndex {
                name: index,
                columns,
            });
        }

        Ok(Self {
            descriptor,
            name,
            table_name,
            properties,
            by_name,
            by_column,
            composite_indexes,
        })
    }

    pub fn descriptor(&self) -> EntityDescriptor {
        self.descriptor
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Entity cache region. Unique per Rust type, unlike display and table names.
    pub fn cache_region(&self) -> &'static str {
        self.descriptor.type_name()
    }

    /// Cache key for an identifier value, normalised through the single id's
    /// declared type. Composite identifiers are used as given.
    pub fn cache_key(&self, id: &Value) -> Value {
        self.id_property()
            .map_or_else(|| id.clone(), |property| property.cache_key(id))
    }

    /// Every property, transient ones included.
    pub fn properties(&self) -> &[PersistentProperty] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PersistentProperty> {
        self.by_name.get(name).map(|&slot| &self.properties[slot])
    }

    /// The property stored in `column`.
    pub fn property_for_column(&self, column: &str) -> Option<&PersistentProperty> {
        self.by_column.get(column).map(|&slot| &self.properties[slot])
    }

    pub fn id_properties(&self) -> Vec<&PersistentProperty> {
        self.properties.iter().filter(|p| p.is_id()).collect()
    }

    /// The identifier when there is exactly one.
    pub fn id_property(&self) -> Option<&PersistentProperty> {
        let mut ids = self.properties.iter().filter(|p| p.is_id());
        match (ids.next(), ids.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    }

    pub fn embedded_properties(&self) -> Vec<&PersistentProperty> {
        self.properties.iter().filter(|p| p.is_embedded()).collect()
    }

    pub fn indexed_properties(&self) -> Vec<&PersistentProperty> {
        self.properties.iter().filter(|p| p.has_index()).collect()
    }

    pub fn association_properties(&self) -> Vec<&PersistentProperty> {
        self.properties.iter().filter(|p| p.is_association()).collect()
    }

    pub fn version_property(&self) -> Option<&PersistentProperty> {
        self.properties.iter().find(|p| p.is_version())
    }

    /// Properties with a storage column.
    pub fn persistent_properties(&self) -> impl Iterator<Item = &PersistentProperty> {
        self.properties.iter().filter(|p| !p.is_transient())
    }

    pub fn composite_indexes(&self) -> &[CompositeIndex] {
        &self.composite_indexes
    }

    pub fn has_identifier(&self) -> bool {
        self.properties.iter().any(PersistentProperty::is_id)
    }

    /// Fail unless this entity can be queried as an aggregate root.
    pub fn require_aggregate_root(&self) -> Result<()> {
        if self.has_identifier() {
            Ok(())
        } else {
            Err(Error::configuration(
                &self.name,
                "no identifier property; the type can only be used as an embedded value",
            ))
        }
    }

    /// The single identifier, or a configuration error.
    pub fn require_single_id(&self) -> Result<&PersistentProperty> {
        self.require_aggregate_root()?;
        self.id_property().ok_or_else(|| {
            Error::configuration(&self.name, "composite identifiers need an explicit filter")
        })
    }

    /// Re-key a store row from storage columns to property names.
    ///
    /// Columns that map to no property are dropped.
    pub fn to_property_row(&self, row: Row) -> Row {
        Row::from_pairs(row.into_pairs().into_iter().filter_map(|(column, value)| {
            self.property_for_column(&column)
                .map(|property| (property.name(), value))
        }))
    }

    /// Storage columns and values for the persistent properties among `values`.
    pub fn to_storage_values(&self, values: Vec<(&'static str, Value)>) -> Vec<(String, Value)> {
        let mut out: Vec<(String, Value)> = values
            .into_iter()
            .filter_map(|(name, value)| {
                self.property(name)
                    .and_then(PersistentProperty::storage_name)
                    .map(|column| (column.to_string(), value))
            })
            .collect();
        // Declaration order, regardless of the order the entity reported them in.
        out.sort_by_key(|(column, _)| self.by_column.get(column).copied().unwrap_or(usize::MAX));
        out
    }
}
