//! Query translation for repobridge.
//!
//! `repobridge-query` converts repository-level descriptors into the store's
//! native `SelectQuery` and statement types.
//!
//! # Role In The Architecture
//!
//! - **Descriptors**: `Sort`/`Order`, `PageRequest`/`Page` and
//!   `Example`/`ExampleMatcher` name properties, never columns.
//! - **Translator**: `apply_sort`, `apply_page`, `apply_example` and
//!   `apply_conditions` resolve those names through the entity model and
//!   validate the whole descriptor before the query is touched.
//! - **Statement builders**: `InsertBuilder`, `InsertManyBuilder`,
//!   `UpdateBuilder` and `DeleteBuilder` render entities into write statements.
//!
//! The `repobridge` facade calls into this crate for every read and write.

pub mod builder;
pub mod example;
pub mod page;
pub mod pattern;
pub mod sort;
pub mod translate;

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod proptests;

pub use builder::{DeleteBuilder, InsertBuilder, InsertManyBuilder, UpdateBuilder};
pub use example::{
    Example, ExampleMatcher, MatchMode, NullHandler, PropertySpecifier, StringMatcher,
    ValueTransformer,
};
pub use page::{Page, PageRequest};
pub use sort::{Direction, NullHandling, Order, Sort};
pub use translate::{
    apply_conditions, apply_example, apply_page, apply_sort, count_for_example,
    example_condition, id_condition, ids_condition, key_condition, order_exprs, select_for,
};
