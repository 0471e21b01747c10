//! Transaction definitions handed to the host manager.

use crate::isolation::HostIsolation;
use serde::Deserialize;
use std::time::Duration;

/// How a scope relates to a transaction that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// Join the running transaction, or start one if there is none.
    #[default]
    Required,
    /// Suspend the running transaction and start an independent one.
    RequiresNew,
}

/// Settings for one transactional unit of work.
///
/// # Example
///
/// ```
/// use repobridge_tx::{HostIsolation, Propagation, TransactionDefinition};
/// use std::time::Duration;
///
/// let def = TransactionDefinition::new()
///     .isolation(HostIsolation::RepeatableRead)
///     .propagation(Propagation::RequiresNew)
///     .timeout(Duration::from_secs(5))
///     .name("transfer");
/// assert_eq!(def.name.as_deref(), Some("transfer"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct TransactionDefinition {
    pub isolation: HostIsolation,
    pub propagation: Propagation,
    /// Enforced by the host manager; the coordinator only passes it on.
    pub timeout: Option<Duration>,
    pub read_only: bool,
    /// Label used in logs.
    pub name: Option<String>,
}

impl TransactionDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings at the given isolation.
    pub fn with_isolation(isolation: HostIsolation) -> Self {
        Self::new().isolation(isolation)
    }

    pub fn isolation(mut self, isolation: HostIsolation) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let def: TransactionDefinition =
            serde_json::from_str(r#"{"isolation":8,"propagation":"requires_new"}"#).unwrap();
        assert_eq!(def.isolation, HostIsolation::Serializable);
        assert_eq!(def.propagation, Propagation::RequiresNew);
        assert!(!def.read_only);
        assert_eq!(def.timeout, None);
    }

    #[test]
    fn test_default_definition() {
        let def = TransactionDefinition::default();
        assert_eq!(def.isolation, HostIsolation::Default);
        assert_eq!(def.propagation, Propagation::Required);
    }
}
