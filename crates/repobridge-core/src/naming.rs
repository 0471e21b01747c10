//! Storage naming strategies.

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Derives a storage name from a property or entity name.
///
/// Explicit `Column`/`Table` annotations and identifier properties bypass the strategy.
pub trait NamingStrategy: Send + Sync + fmt::Debug {
    /// Storage name for a property or entity name.
    fn storage_name(&self, name: &str) -> String;
}

/// Keeps names verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl NamingStrategy for Verbatim {
    fn storage_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// `createdAt` -> `created_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

impl NamingStrategy for SnakeCase {
    fn storage_name(&self, name: &str) -> String {
        name.to_case(Case::Snake)
    }
}

/// `createdAt` -> `CREATED_AT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpperSnakeCase;

impl NamingStrategy for UpperSnakeCase {
    fn storage_name(&self, name: &str) -> String {
        name.to_case(Case::Snake).to_uppercase()
    }
}

/// `created_at` -> `createdAt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCase;

impl NamingStrategy for CamelCase {
    fn storage_name(&self, name: &str) -> String {
        name.to_case(Case::Camel)
    }
}

/// Configuration-level selector for the built-in strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategyKind {
    #[default]
    Verbatim,
    SnakeCase,
    UpperSnakeCase,
    CamelCase,
}

impl NamingStrategyKind {
    /// Instantiate the selected strategy.
    pub fn strategy(self) -> Arc<dyn NamingStrategy> {
        match self {
            NamingStrategyKind::Verbatim => Arc::new(Verbatim),
            NamingStrategyKind::SnakeCase => Arc::new(SnakeCase),
            NamingStrategyKind::UpperSnakeCase => Arc::new(UpperSnakeCase),
            NamingStrategyKind::CamelCase => Arc::new(CamelCase),
        }
    }
}
