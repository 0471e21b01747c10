//! The host's connection-level transaction manager.

use crate::definition::TransactionDefinition;
use repobridge_core::Result;

/// Connection-level transaction manager owned by the host application.
///
/// This is the system of record: its commit or rollback outcome is what
/// callers observe. Errors should be `Error::Transaction`; anything else is
/// wrapped by the coordinator.
pub trait HostTransactionManager: Send + Sync {
    /// Per-transaction status object.
    type Status: Send;
    /// Resources detached by `suspend`, handed back to `resume`.
    type Suspended: Send;

    fn begin(&self, definition: &TransactionDefinition) -> Result<Self::Status>;

    fn commit(&self, status: Self::Status) -> Result<()>;

    fn rollback(&self, status: Self::Status) -> Result<()>;

    /// Detach the transaction from the current scope.
    fn suspend(&self, status: &mut Self::Status) -> Result<Self::Suspended>;

    /// Reattach resources returned by `suspend`.
    fn resume(&self, status: &mut Self::Status, suspended: Self::Suspended) -> Result<()>;
}
