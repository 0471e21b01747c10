//! Mapping configuration.

use repobridge_core::NamingStrategyKind;
use serde::Deserialize;

/// Configuration consumed when entity models are built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Strategy used for storage names that are not set explicitly.
    pub naming: NamingStrategyKind,
    /// Register embedded and association target types along with their owner.
    pub explore_property_types: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            naming: NamingStrategyKind::Verbatim,
            explore_property_types: true,
        }
    }
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the naming strategy.
    pub fn naming(mut self, naming: NamingStrategyKind) -> Self {
        self.naming = naming;
        self
    }

    /// Enable or disable property type exploration.
    pub fn explore_property_types(mut self, explore: bool) -> Self {
        self.explore_property_types = explore;
        self
    }
}
