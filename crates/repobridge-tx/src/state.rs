//! Transaction scope state and the handle pair.

use crate::manager::HostTransactionManager;
use repobridge_core::{Error, IsolationLevel, Result};
use std::fmt;

/// Lifecycle of one transactional scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    NotStarted,
    Active,
    Suspended,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionState::NotStarted => "not started",
            TransactionState::Active => "active",
            TransactionState::Suspended => "suspended",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        }
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub const fn can_transition_to(self, next: TransactionState) -> bool {
        matches!(
            (self, next),
            (TransactionState::NotStarted, TransactionState::Active)
                | (
                    TransactionState::Active,
                    TransactionState::Suspended
                        | TransactionState::Committed
                        | TransactionState::RolledBack
                )
                | (TransactionState::Suspended, TransactionState::Active)
        )
    }

    pub const fn is_completed(self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::RolledBack)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The host status and the native transaction of one scope, kept in step
/// by `TransactionCoordinator`.
pub struct TransactionHandle<M: HostTransactionManager> {
    pub(crate) status: Option<M::Status>,
    pub(crate) suspended: Option<M::Suspended>,
    pub(crate) native_active: bool,
    pub(crate) isolation: Option<IsolationLevel>,
    pub(crate) state: TransactionState,
    pub(crate) rollback_only: bool,
    pub(crate) name: Option<String>,
}

impl<M: HostTransactionManager> TransactionHandle<M> {
    pub(crate) fn new(isolation: Option<IsolationLevel>, name: Option<String>) -> Self {
        Self {
            status: None,
            suspended: None,
            native_active: false,
            isolation,
            state: TransactionState::NotStarted,
            rollback_only: false,
            name,
        }
    }

    /// Host status, until the scope completes.
    pub fn status(&self) -> Option<&M::Status> {
        self.status.as_ref()
    }

    /// Whether the native transaction was active after the last step.
    pub fn is_native_active(&self) -> bool {
        self.native_active
    }

    /// Isolation requested from the store; `None` is the store default.
    pub fn isolation(&self) -> Option<IsolationLevel> {
        self.isolation
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Make the eventual commit roll back instead.
    pub fn set_rollback_only(&mut self) {
        self.rollback_only = true;
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    pub(crate) fn expect(&self, expected: TransactionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::IllegalTransactionState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    pub(crate) fn transition(&mut self, next: TransactionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::IllegalTransactionState {
                expected: next.as_str(),
                actual: self.state.as_str(),
            });
        }
        self.state = next;
        Ok(())
    }
}

impl<M: HostTransactionManager> fmt::Debug for TransactionHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("native_active", &self.native_active)
            .field("isolation", &self.isolation)
            .field("rollback_only", &self.rollback_only)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_edges() {
        use TransactionState::*;
        assert!(NotStarted.can_transition_to(Active));
        assert!(Active.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Active));
        assert!(Active.can_transition_to(Committed));
        assert!(Active.can_transition_to(RolledBack));

        assert!(!NotStarted.can_transition_to(Committed));
        assert!(!Suspended.can_transition_to(Committed));
        assert!(!Suspended.can_transition_to(RolledBack));
        assert!(!Committed.can_transition_to(Active));
        assert!(!RolledBack.can_transition_to(RolledBack));
    }

    #[test]
    fn test_completed() {
        assert!(TransactionState::Committed.is_completed());
        assert!(TransactionState::RolledBack.is_completed());
        assert!(!TransactionState::Suspended.is_completed());
    }
}
