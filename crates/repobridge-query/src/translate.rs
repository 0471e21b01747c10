//! Translation of sort, page and example descriptors into `SelectQuery`s.
//!
//! Every function here validates the whole descriptor against the entity
//! model before touching the query, so a descriptor that names an unknown
//! property or carries a mistyped probe value never yields a partly built
//! query. None of them keep state between calls.

use crate::example::{Example, MatchMode, NullHandler, StringMatcher};
use crate::page::PageRequest;
use crate::pattern;
use crate::sort::Sort;
use repobridge_core::{
    Entity, Error, Expr, OrderExpr, Result, SelectQuery, TranslationError, TranslationErrorKind,
    Value,
};
use repobridge_mapping::{PersistentEntity, PersistentProperty};

fn fail(model: &PersistentEntity, descriptor: &'static str, kind: TranslationErrorKind) -> TranslationError {
    TranslationError::new(model.name(), descriptor, kind)
}

/// Resolve a property to its storage column.
fn column_of<'m>(
    model: &'m PersistentEntity,
    descriptor: &'static str,
    property: &str,
) -> std::result::Result<(&'m PersistentProperty, &'m str), TranslationError> {
    let found = model.property(property).ok_or_else(|| {
        fail(
            model,
            descriptor,
            TranslationErrorKind::UnknownProperty(property.to_string()),
        )
    })?;
    let column = found.storage_name().ok_or_else(|| {
        fail(
            model,
            descriptor,
            TranslationErrorKind::TransientProperty(property.to_string()),
        )
    })?;
    Ok((found, column))
}

fn check_type(
    model: &PersistentEntity,
    descriptor: &'static str,
    property: &PersistentProperty,
    value: &Value,
) -> std::result::Result<(), TranslationError> {
    if property.sql_type().accepts(value) {
        Ok(())
    } else {
        Err(fail(
            model,
            descriptor,
            TranslationErrorKind::TypeMismatch {
                property: property.name().to_string(),
                expected: property.sql_type().name(),
                found: value.type_name(),
            },
        ))
    }
}

/// A fresh select of every stored column of `model`.
pub fn select_for(model: &PersistentEntity) -> SelectQuery {
    SelectQuery::from(model.table_name()).columns(
        model
            .persistent_properties()
            .filter_map(PersistentProperty::storage_name),
    )
}

/// Order-by terms for `sort`, positionally.
pub fn order_exprs(model: &PersistentEntity, sort: &Sort) -> Result<Vec<OrderExpr>> {
    let mut out = Vec::with_capacity(sort.len());
    for order in sort {
        let (_, column) = column_of(model, "sort", order.property())?;
        out.push(OrderExpr {
            column: column.to_string(),
            direction: order.direction(),
            ignore_case: order.is_ignore_case(),
            nulls: order.null_handling(),
        });
    }
    Ok(out)
}

/// Append the terms of `sort` to the query's ordering.
pub fn apply_sort(query: SelectQuery, model: &PersistentEntity, sort: &Sort) -> Result<SelectQuery> {
    let orders = order_exprs(model, sort)?;
    Ok(orders.into_iter().fold(query, SelectQuery::order_by))
}

/// Apply the request's sort, then `limit = size` and `offset = page * size`.
pub fn apply_page(
    query: SelectQuery,
    model: &PersistentEntity,
    page: &PageRequest,
) -> Result<SelectQuery> {
    let offset = page.offset().ok_or_else(|| {
        fail(
            model,
            "page",
            TranslationErrorKind::OffsetOverflow {
                page: page.page(),
                size: page.size(),
            },
        )
    })?;
    let query = apply_sort(query, model, page.sort())?;
    Ok(query.limit(page.size()).offset(offset))
}

/// The condition an example stands for, or `None` when it constrains nothing.
pub fn example_condition<E: Entity>(
    model: &PersistentEntity,
    example: &Example<E>,
) -> Result<Option<Expr>> {
    let matcher = example.matcher();
    let mut conditions = Vec::new();

    for (name, value) in example.probe().to_values() {
        if matcher.is_ignored_path(name) {
            continue;
        }
        let property = model.property(name).ok_or_else(|| {
            fail(
                model,
                "example",
                TranslationErrorKind::UnknownProperty(name.to_string()),
            )
        })?;
        let Some(column) = property.storage_name() else {
            continue;
        };
        let value = match matcher.specifier(name) {
            Some(spec) => spec.transform(value).unwrap_or(Value::Null),
            None => value,
        };

        if value.is_null() {
            if matcher.null_handler() == NullHandler::Include {
                conditions.push(Expr::col(column).is_null());
            }
            continue;
        }
        check_type(model, "example", property, &value)?;

        let (string_matcher, explicit) = matcher.string_matcher_for(name);
        let ignore_case = matcher.ignore_case_for(name);
        let text = match &value {
            Value::Text(s) if property.sql_type().is_textual() => Some(s.as_str()),
            _ => None,
        };

        let condition = match text {
            Some(text) => text_condition(model, column, name, text, string_matcher, ignore_case)?,
            None if explicit && string_matcher.is_text_only() => {
                return Err(fail(
                    model,
                    "example",
                    TranslationErrorKind::MatcherNotApplicable {
                        property: name.to_string(),
                        matcher: string_matcher.to_string(),
                    },
                )
                .into());
            }
            None => Expr::col(column).eq(value),
        };
        conditions.push(condition);
    }

    Ok(match matcher.mode() {
        MatchMode::All => Expr::all(conditions),
        MatchMode::Any => Expr::any(conditions),
    })
}

fn text_condition(
    model: &PersistentEntity,
    column: &str,
    property: &str,
    text: &str,
    matcher: StringMatcher,
    ignore_case: bool,
) -> Result<Expr> {
    let like = |pattern: String| {
        if ignore_case {
            Expr::col(column).ilike(pattern)
        } else {
            Expr::col(column).like(pattern)
        }
    };
    Ok(match matcher {
        StringMatcher::Default | StringMatcher::Exact => {
            if ignore_case {
                Expr::col(column).eq_ignore_case(text)
            } else {
                Expr::col(column).eq(text)
            }
        }
        StringMatcher::Starting => like(format!("{}%", pattern::escape_like(text))),
        StringMatcher::Ending => like(format!("%{}", pattern::escape_like(text))),
        StringMatcher::Containing => like(format!("%{}%", pattern::escape_like(text))),
        StringMatcher::Regex => {
            pattern::compile(text, ignore_case).map_err(|message| {
                fail(
                    model,
                    "example",
                    TranslationErrorKind::InvalidPattern {
                        property: property.to_string(),
                        message,
                    },
                )
            })?;
            Expr::col(column).matches(text, ignore_case)
        }
    })
}

/// Add the example's condition to the query's filter.
pub fn apply_example<E: Entity>(
    query: SelectQuery,
    model: &PersistentEntity,
    example: &Example<E>,
) -> Result<SelectQuery> {
    Ok(match example_condition(model, example)? {
        Some(condition) => query.filter(condition),
        None => query,
    })
}

/// A count query for the rows matching `example`.
pub fn count_for_example<E: Entity>(
    model: &PersistentEntity,
    example: &Example<E>,
) -> Result<SelectQuery> {
    apply_example(SelectQuery::from(model.table_name()), model, example)
}

/// AND pre-built conditions into the filter, then append `sort`.
///
/// Conditions are used verbatim, but every column they name must belong to
/// the entity.
pub fn apply_conditions<I>(
    query: SelectQuery,
    model: &PersistentEntity,
    conditions: I,
    sort: Option<&Sort>,
) -> Result<SelectQuery>
where
    I: IntoIterator<Item = Expr>,
{
    let conditions: Vec<Expr> = conditions.into_iter().collect();
    for condition in &conditions {
        for column in condition.columns() {
            if model.property_for_column(column).is_none() {
                return Err(fail(
                    model,
                    "conditions",
                    TranslationErrorKind::UnknownProperty(column.to_string()),
                )
                .into());
            }
        }
    }
    let orders = match sort {
        Some(sort) => order_exprs(model, sort)?,
        None => Vec::new(),
    };
    let query = conditions.into_iter().fold(query, SelectQuery::filter);
    Ok(orders.into_iter().fold(query, SelectQuery::order_by))
}

/// `id = key` for an entity with a single identifier.
pub fn id_condition(model: &PersistentEntity, key: &Value) -> Result<Expr> {
    let id = model.require_single_id()?;
    let (_, column) = column_of(model, "identifier", id.name())?;
    check_type(model, "identifier", id, key)?;
    Ok(Expr::col(column).eq(key.clone()))
}

/// `id IN (keys)` for an entity with a single identifier.
pub fn ids_condition(model: &PersistentEntity, keys: &[Value]) -> Result<Expr> {
    let id = model.require_single_id()?;
    let (_, column) = column_of(model, "identifier", id.name())?;
    for key in keys {
        check_type(model, "identifier", id, key)?;
    }
    Ok(Expr::col(column).in_list(keys.iter().cloned()))
}

/// Equality on every identifier property of `entity`.
pub fn key_condition<E: Entity>(model: &PersistentEntity, entity: &E) -> Result<Expr> {
    model.require_aggregate_root()?;
    let conditions: Vec<Expr> = model
        .id_properties()
        .into_iter()
        .filter_map(|id| {
            id.storage_name()
                .map(|column| Expr::col(column).eq(entity.value_of(id.name())))
        })
        .collect();
    Expr::all(conditions).ok_or_else(|| {
        Error::configuration(model.name(), "identifier has no storage column")
    })
}
