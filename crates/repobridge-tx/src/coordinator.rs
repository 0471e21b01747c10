//! Keeps the host transaction and the store's native transaction in step.
//!
//! The host manager owns the connection and is authoritative. The native
//! transaction is driven first on every completion but only best-effort:
//! its commit or rollback failures are logged and never reach the caller.
//! The exception is `begin`, where a native failure is fatal.

use crate::definition::{Propagation, TransactionDefinition};
use crate::isolation::{HostIsolation, translate_isolation};
use crate::manager::HostTransactionManager;
use crate::state::{TransactionHandle, TransactionState};
use repobridge_core::{Error, NativeTransaction, Result, TxPhase};
use std::fmt;
use std::sync::Arc;

const TARGET: &str = "repobridge::tx";

fn host_error(phase: TxPhase, error: Error) -> Error {
    match error {
        Error::Transaction { .. } | Error::IllegalTransactionState { .. } => error,
        other => Error::transaction(phase, other.to_string()),
    }
}

fn missing_status(phase: TxPhase) -> Error {
    Error::transaction(phase, "transaction handle has no host status")
}

/// Drives a host transaction manager and a native store transaction as one.
pub struct TransactionCoordinator<M, S> {
    manager: M,
    native: Arc<S>,
}

impl<M, S> fmt::Debug for TransactionCoordinator<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionCoordinator").finish_non_exhaustive()
    }
}

impl<M: HostTransactionManager, S: NativeTransaction> TransactionCoordinator<M, S> {
    pub fn new(manager: M, native: Arc<S>) -> Self {
        Self { manager, native }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn native(&self) -> &Arc<S> {
        &self.native
    }

    /// Start the host transaction, then the native one at the translated isolation.
    ///
    /// If the native begin fails the host transaction is rolled back
    /// (best-effort) and the native error is returned.
    #[tracing::instrument(level = "debug", skip(self, definition), fields(name = definition.name.as_deref()))]
    pub fn begin(&self, definition: &TransactionDefinition) -> Result<TransactionHandle<M>> {
        let isolation = translate_isolation(definition.isolation);
        if let HostIsolation::Other(code) = definition.isolation {
            tracing::debug!(
                target: TARGET,
                code,
                "Unrecognised host isolation, using the store default"
            );
        }

        let mut handle = TransactionHandle::new(isolation, definition.name.clone());
        let status = self
            .manager
            .begin(definition)
            .map_err(|e| host_error(TxPhase::Begin, e))?;

        if let Err(e) = self.native.begin_transaction(isolation) {
            tracing::error!(target: TARGET, error = %e, "Native begin failed");
            if let Err(cleanup) = self.manager.rollback(status) {
                tracing::warn!(
                    target: TARGET,
                    error = %cleanup,
                    "Host rollback after failed native begin also failed"
                );
            }
            return Err(host_error(TxPhase::Begin, e));
        }

        handle.status = Some(status);
        handle.native_active = true;
        handle.transition(TransactionState::Active)?;
        tracing::info!(
            target: TARGET,
            isolation = ?isolation,
            read_only = definition.read_only,
            "Transaction started"
        );
        Ok(handle)
    }

    /// Commit natively (best-effort), then on the host.
    ///
    /// A rollback-only handle is rolled back instead. A failed host commit
    /// leaves the scope rolled back.
    #[tracing::instrument(level = "debug", skip(self, handle), fields(name = handle.name()))]
    pub fn commit(&self, handle: &mut TransactionHandle<M>) -> Result<()> {
        handle.expect(TransactionState::Active)?;
        if handle.rollback_only {
            tracing::info!(target: TARGET, "Transaction is rollback-only, rolling back");
            return self.rollback(handle);
        }

        if self.native.is_active() {
            if let Err(e) = self.native.commit() {
                tracing::warn!(
                    target: TARGET,
                    error = %e,
                    "Native commit failed, host commit decides the outcome"
                );
            }
        }
        handle.native_active = self.native.is_active();

        let status = handle
            .status
            .take()
            .ok_or_else(|| missing_status(TxPhase::Commit))?;
        match self.manager.commit(status) {
            Ok(()) => {
                handle.transition(TransactionState::Committed)?;
                if handle.native_active {
                    tracing::warn!(
                        target: TARGET,
                        "Native transaction still active after host commit"
                    );
                }
                tracing::info!(target: TARGET, "Transaction committed");
                Ok(())
            }
            Err(e) => {
                handle.transition(TransactionState::RolledBack)?;
                Err(host_error(TxPhase::Commit, e))
            }
        }
    }

    /// Roll back natively (best-effort), then on the host.
    #[tracing::instrument(level = "debug", skip(self, handle), fields(name = handle.name()))]
    pub fn rollback(&self, handle: &mut TransactionHandle<M>) -> Result<()> {
        handle.expect(TransactionState::Active)?;

        if self.native.is_active() {
            if let Err(e) = self.native.rollback() {
                tracing::warn!(
                    target: TARGET,
                    error = %e,
                    "Native rollback failed, continuing with host rollback"
                );
            }
        }
        handle.native_active = self.native.is_active();

        let status = handle
            .status
            .take()
            .ok_or_else(|| missing_status(TxPhase::Rollback))?;
        let outcome = self.manager.rollback(status);
        handle.transition(TransactionState::RolledBack)?;
        outcome.map_err(|e| host_error(TxPhase::Rollback, e))?;
        tracing::info!(target: TARGET, "Transaction rolled back");
        Ok(())
    }

    /// Detach the host transaction. The native transaction stays as it is.
    pub fn suspend(&self, handle: &mut TransactionHandle<M>) -> Result<()> {
        handle.expect(TransactionState::Active)?;
        let status = handle
            .status
            .as_mut()
            .ok_or_else(|| missing_status(TxPhase::Suspend))?;
        let suspended = self
            .manager
            .suspend(status)
            .map_err(|e| host_error(TxPhase::Suspend, e))?;
        handle.suspended = Some(suspended);
        handle.transition(TransactionState::Suspended)?;
        tracing::debug!(target: TARGET, name = handle.name(), "Transaction suspended");
        Ok(())
    }

    /// Reattach a suspended host transaction.
    pub fn resume(&self, handle: &mut TransactionHandle<M>) -> Result<()> {
        handle.expect(TransactionState::Suspended)?;
        let suspended = handle
            .suspended
            .take()
            .ok_or_else(|| Error::transaction(TxPhase::Resume, "no suspended resources"))?;
        let status = handle
            .status
            .as_mut()
            .ok_or_else(|| missing_status(TxPhase::Resume))?;
        self.manager
            .resume(status, suspended)
            .map_err(|e| host_error(TxPhase::Resume, e))?;
        handle.transition(TransactionState::Active)?;
        tracing::debug!(target: TARGET, name = handle.name(), "Transaction resumed");
        Ok(())
    }

    /// Run `work` in a new transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// The work's error wins over a failed rollback, which is only logged.
    pub fn execute<T>(
        &self,
        definition: &TransactionDefinition,
        work: impl FnOnce(&mut TransactionHandle<M>) -> Result<T>,
    ) -> Result<T> {
        let mut handle = self.begin(definition)?;
        match work(&mut handle) {
            Ok(value) => {
                self.commit(&mut handle)?;
                Ok(value)
            }
            Err(e) => {
                if handle.state() == TransactionState::Active {
                    if let Err(rollback) = self.rollback(&mut handle) {
                        tracing::warn!(
                            target: TARGET,
                            error = %rollback,
                            "Rollback after failed unit of work also failed"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Run `work` inside `outer` according to the definition's propagation.
    ///
    /// `Required` joins an active outer scope; a failure marks the outer
    /// scope rollback-only. `RequiresNew` suspends the outer scope for the
    /// duration of an independent transaction and resumes it afterwards.
    pub fn execute_nested<T>(
        &self,
        outer: &mut TransactionHandle<M>,
        definition: &TransactionDefinition,
        work: impl FnOnce(&mut TransactionHandle<M>) -> Result<T>,
    ) -> Result<T> {
        match definition.propagation {
            Propagation::Required if outer.state() == TransactionState::Active => {
                let result = work(outer);
                if result.is_err() {
                    outer.set_rollback_only();
                }
                result
            }
            Propagation::Required => self.execute(definition, work),
            Propagation::RequiresNew => {
                self.suspend(outer)?;
                let result = self.execute(definition, work);
                match self.resume(outer) {
                    Ok(()) => result,
                    Err(e) if result.is_ok() => Err(e),
                    Err(e) => {
                        tracing::warn!(
                            target: TARGET,
                            error = %e,
                            "Resuming the outer transaction failed"
                        );
                        result
                    }
                }
            }
        }
    }
}
