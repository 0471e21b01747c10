//! Statement builders for INSERT, UPDATE and DELETE.
//!
//! These builders turn entities into the store's native statements:
//! - Bulk inserts
//! - Upserts (on-conflict handling)
//! - Explicit column SET for updates, and optimistic locking on the version property
//! - Entity- and id-based deletes
//!
//! Builders take property names; storage columns are resolved through the
//! entity model when `build` is called.

use crate::translate::{id_condition, key_condition};
use repobridge_core::{
    DeleteStatement, Entity, Error, Expr, InsertStatement, OnConflict, Result, TranslationError,
    TranslationErrorKind, UpdateStatement, Value,
};
use repobridge_mapping::PersistentEntity;

fn resolve_columns(
    model: &PersistentEntity,
    descriptor: &'static str,
    properties: &[&str],
) -> Result<Vec<String>> {
    properties
        .iter()
        .map(|name| {
            model
                .property(name)
                .and_then(|p| p.storage_name())
                .map(str::to_string)
                .ok_or_else(|| {
                    TranslationError::new(
                        model.name(),
                        descriptor,
                        TranslationErrorKind::UnknownProperty((*name).to_string()),
                    )
                    .into()
                })
        })
        .collect()
}

/// Storage values of `entity`, leaving out identifiers the store will assign.
fn insert_values<E: Entity>(model: &PersistentEntity, entity: &E) -> Vec<(String, Value)> {
    let values: Vec<(&'static str, Value)> = entity
        .to_values()
        .into_iter()
        .filter(|(name, value)| {
            !(value.is_null() && model.property(name).is_some_and(|p| p.is_id()))
        })
        .collect();
    model.to_storage_values(values)
}

#[derive(Debug, Clone, Default)]
enum ConflictSpec {
    #[default]
    None,
    DoNothing,
    DoUpdate {
        columns: Vec<&'static str>,
        target: Vec<&'static str>,
    },
}

impl ConflictSpec {
    /// Resolve property names to columns. An empty update list means every
    /// non-identifier column; an empty target means the identifier.
    fn resolve(&self, model: &PersistentEntity) -> Result<Option<OnConflict>> {
        match self {
            ConflictSpec::None => Ok(None),
            ConflictSpec::DoNothing => Ok(Some(OnConflict::DoNothing)),
            ConflictSpec::DoUpdate { columns, target } => {
                let columns = if columns.is_empty() {
                    model
                        .persistent_properties()
                        .filter(|p| !p.is_id())
                        .filter_map(|p| p.storage_name().map(str::to_string))
                        .collect()
                } else {
                    resolve_columns(model, "upsert", columns)?
                };
                let target = if target.is_empty() {
                    model.require_aggregate_root()?;
                    model
                        .id_properties()
                        .into_iter()
                        .filter_map(|p| p.storage_name().map(str::to_string))
                        .collect()
                } else {
                    resolve_columns(model, "upsert", target)?
                };
                Ok(Some(OnConflict::DoUpdate { columns, target }))
            }
        }
    }
}

/// INSERT builder for one entity.
#[derive(Debug)]
pub struct InsertBuilder<'a, E: Entity> {
    model: &'a PersistentEntity,
    entity: &'a E,
    on_conflict: ConflictSpec,
}

impl<'a, E: Entity> InsertBuilder<'a, E> {
    pub fn new(model: &'a PersistentEntity, entity: &'a E) -> Self {
        Self {
            model,
            entity,
            on_conflict: ConflictSpec::None,
        }
    }

    /// Silently skip the row if it conflicts with an existing one.
    pub fn on_conflict_do_nothing(mut self) -> Self {
        self.on_conflict = ConflictSpec::DoNothing;
        self
    }

    /// Overwrite the given properties of the conflicting row (upsert).
    ///
    /// An empty list overwrites every non-identifier property. The conflict
    /// target is the identifier.
    pub fn on_conflict_do_update(mut self, properties: &[&'static str]) -> Self {
        self.on_conflict = ConflictSpec::DoUpdate {
            columns: properties.to_vec(),
            target: Vec::new(),
        };
        self
    }

    /// Upsert with an explicit conflict target.
    pub fn on_conflict_target_do_update(
        mut self,
        target: &[&'static str],
        properties: &[&'static str],
    ) -> Self {
        self.on_conflict = ConflictSpec::DoUpdate {
            columns: properties.to_vec(),
            target: target.to_vec(),
        };
        self
    }

    pub fn build(&self) -> Result<InsertStatement> {
        Ok(InsertStatement {
            table: self.model.table_name().to_string(),
            rows: vec![insert_values(self.model, self.entity)],
            on_conflict: self.on_conflict.resolve(self.model)?,
        })
    }
}

/// INSERT builder for several entities in one statement.
#[derive(Debug)]
pub struct InsertManyBuilder<'a, E: Entity> {
    model: &'a PersistentEntity,
    entities: &'a [E],
    on_conflict: ConflictSpec,
}

impl<'a, E: Entity> InsertManyBuilder<'a, E> {
    pub fn new(model: &'a PersistentEntity, entities: &'a [E]) -> Self {
        Self {
            model,
            entities,
            on_conflict: ConflictSpec::None,
        }
    }

    pub fn on_conflict_do_nothing(mut self) -> Self {
        self.on_conflict = ConflictSpec::DoNothing;
        self
    }

    pub fn on_conflict_do_update(mut self, properties: &[&'static str]) -> Self {
        self.on_conflict = ConflictSpec::DoUpdate {
            columns: properties.to_vec(),
            target: Vec::new(),
        };
        self
    }

    pub fn build(&self) -> Result<InsertStatement> {
        Ok(InsertStatement {
            table: self.model.table_name().to_string(),
            rows: self
                .entities
                .iter()
                .map(|e| insert_values(self.model, e))
                .collect(),
            on_conflict: self.on_conflict.resolve(self.model)?,
        })
    }
}

/// UPDATE builder.
///
/// With an entity, every non-identifier property is written and the
/// statement is filtered on the entity's identifier. When the entity has a
/// version property, the filter also requires the current version and the
/// version is incremented, so a concurrent update makes this one affect no
/// rows.
#[derive(Debug)]
pub struct UpdateBuilder<'a, E: Entity> {
    model: &'a PersistentEntity,
    entity: Option<&'a E>,
    filter: Option<Expr>,
    set_only: Option<Vec<&'static str>>,
    explicit_sets: Vec<(&'static str, Value)>,
}

impl<'a, E: Entity> UpdateBuilder<'a, E> {
    pub fn new(model: &'a PersistentEntity, entity: &'a E) -> Self {
        Self {
            model,
            entity: Some(entity),
            filter: None,
            set_only: None,
            explicit_sets: Vec::new(),
        }
    }

    /// Builder for explicit SETs without an entity instance.
    pub fn empty(model: &'a PersistentEntity) -> Self {
        Self {
            model,
            entity: None,
            filter: None,
            set_only: None,
            explicit_sets: Vec::new(),
        }
    }

    /// Set a property to a value, overriding the entity's value.
    pub fn set(mut self, property: &'static str, value: impl Into<Value>) -> Self {
        self.explicit_sets.push((property, value.into()));
        self
    }

    /// Only write these properties of the entity.
    pub fn set_only(mut self, properties: &[&'static str]) -> Self {
        self.set_only = Some(properties.to_vec());
        self
    }

    /// Add a condition; replaces the identifier filter.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn build(&self) -> Result<UpdateStatement> {
        let model = self.model;
        let mut sets: Vec<(String, Value)> = Vec::new();

        let explicit: Vec<&str> = self.explicit_sets.iter().map(|(p, _)| *p).collect();
        let explicit_columns = resolve_columns(model, "update", &explicit)?;
        for (column, (_, value)) in explicit_columns.into_iter().zip(&self.explicit_sets) {
            sets.push((column, value.clone()));
        }

        let mut filter = self.filter.clone();
        if let Some(entity) = self.entity {
            if let Some(only) = &self.set_only {
                resolve_columns(model, "update", only)?;
            }
            let version = model.version_property();
            for (name, value) in entity.to_values() {
                let Some(property) = model.property(name) else {
                    continue;
                };
                let Some(column) = property.storage_name() else {
                    continue;
                };
                if property.is_id() || property.is_version() {
                    continue;
                }
                if self.set_only.as_ref().is_some_and(|only| !only.contains(&name)) {
                    continue;
                }
                if sets.iter().any(|(c, _)| c == column) {
                    continue;
                }
                sets.push((column.to_string(), value));
            }

            if filter.is_none() {
                let mut key = key_condition(model, entity)?;
                if let Some(version) = version {
                    if let Some(column) = version.storage_name() {
                        let current = entity.value_of(version.name());
                        let next = match current.as_i64() {
                            Some(v) => Value::BigInt(v.saturating_add(1)),
                            None => Value::BigInt(1),
                        };
                        key = key.and(if current.is_null() {
                            Expr::col(column).is_null()
                        } else {
                            Expr::col(column).eq(current)
                        });
                        if !sets.iter().any(|(c, _)| c == column) {
                            sets.push((column.to_string(), next));
                        }
                    }
                }
                filter = Some(key);
            }
        }

        if sets.is_empty() {
            return Err(Error::Usage(format!(
                "update of `{}` sets no columns",
                model.name()
            )));
        }
        Ok(UpdateStatement {
            table: model.table_name().to_string(),
            sets,
            filter,
        })
    }
}

/// DELETE builder.
#[derive(Debug)]
pub struct DeleteBuilder<'a> {
    model: &'a PersistentEntity,
    filter: Option<Expr>,
}

impl<'a> DeleteBuilder<'a> {
    /// Delete every row of the entity's table.
    pub fn new(model: &'a PersistentEntity) -> Self {
        Self {
            model,
            filter: None,
        }
    }

    /// Delete the row of one entity, matched on its identifier.
    pub fn from_entity<E: Entity>(model: &'a PersistentEntity, entity: &E) -> Result<Self> {
        Ok(Self::new(model).filter(key_condition(model, entity)?))
    }

    /// Delete the row with identifier `key`.
    pub fn by_id(model: &'a PersistentEntity, key: &Value) -> Result<Self> {
        Ok(Self::new(model).filter(id_condition(model, key)?))
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn build(&self) -> DeleteStatement {
        DeleteStatement {
            table: self.model.table_name().to_string(),
            filter: self.filter.clone(),
        }
    }
}
