//! Transaction coordination for repobridge.
//!
//! Two transactional resources take part in every unit of work: the host
//! application's connection-level transaction, reached through
//! `HostTransactionManager`, and the store's own `NativeTransaction`.
//! `TransactionCoordinator` keeps them in step.
//!
//! # Precedence
//!
//! - `begin` starts the host transaction, then the native one at the
//!   isolation translated by `translate_isolation`. A native failure rolls
//!   the host back and is returned.
//! - `commit` and `rollback` run natively first. Native failures are logged
//!   under the `repobridge::tx` target and swallowed; the host outcome is
//!   what the caller sees.
//! - `suspend` and `resume` only touch the host transaction.
//!
//! A native transaction can therefore outlive a committed host transaction.
//! That case is logged as a warning and left to the store.
//!
//! # Example
//!
//! ```ignore
//! let coordinator = TransactionCoordinator::new(host_manager, Arc::clone(&store));
//! let def = TransactionDefinition::with_isolation(HostIsolation::RepeatableRead);
//! let total = coordinator.execute(&def, |_handle| transfer(&store, 100))?;
//! ```

mod coordinator;
mod definition;
mod isolation;
mod manager;
mod state;

pub use coordinator::TransactionCoordinator;
pub use definition::{Propagation, TransactionDefinition};
pub use isolation::{HostIsolation, translate_isolation};
pub use manager::HostTransactionManager;
pub use state::{TransactionHandle, TransactionState};
