//! Store collaborator contracts.
//!
//! The store is the object/relational mapper this crate sits on top of. The
//! repobridge crates only rely on the operations below; SQL generation,
//! pooling and the wire protocol all stay inside the store implementation.

use crate::error::Result;
use crate::query::{DeleteStatement, InsertStatement, SelectQuery, UpdateStatement};
use crate::row::Row;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Isolation levels understood by the native store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// No transaction isolation.
    None,
    /// Dirty reads allowed.
    ReadUncommitted,
    /// Only committed data is visible.
    ReadCommitted,
    /// Rows read stay stable for the transaction.
    RepeatableRead,
    /// Full serializability.
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, as used in `SET TRANSACTION ISOLATION LEVEL ...`.
    pub const fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::None => "NONE",
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// The store's own transaction handle.
///
/// This is secondary bookkeeping next to the host's connection-level
/// transaction; `repobridge-tx` keeps the two in step.
pub trait NativeTransaction: Send + Sync {
    /// Start a native transaction, at the given isolation or the store default.
    fn begin_transaction(&self, isolation: Option<IsolationLevel>) -> Result<()>;

    /// Commit the active native transaction.
    fn commit(&self) -> Result<()>;

    /// Roll back the active native transaction.
    fn rollback(&self) -> Result<()>;

    /// Whether a native transaction is currently active.
    fn is_active(&self) -> bool;
}

/// Operations the facade needs from the store.
pub trait Store: NativeTransaction {
    /// Run a select and return rows keyed by storage column names.
    fn select(&self, query: &SelectQuery) -> Result<Vec<Row>>;

    /// Count rows matching the query's filter (order/limit/offset ignored).
    fn count(&self, query: &SelectQuery) -> Result<u64>;

    /// Insert one row. Returns rows affected.
    fn insert(&self, statement: &InsertStatement) -> Result<u64>;

    /// Insert or update on conflict. Returns rows affected.
    fn upsert(&self, statement: &InsertStatement) -> Result<u64>;

    /// Update rows. Returns rows affected.
    fn update(&self, statement: &UpdateStatement) -> Result<u64>;

    /// Delete rows. Returns rows affected.
    fn delete(&self, statement: &DeleteStatement) -> Result<u64>;

    /// Look up a single row by its key column.
    fn find_by_key(&self, table: &str, key_column: &str, key: &Value) -> Result<Option<Row>>;

    /// Run a raw query in the store's native language.
    fn query_raw(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a raw statement in the store's native language.
    fn execute_raw(&self, sql: &str, params: &[Value]) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_sql() {
        assert_eq!(IsolationLevel::RepeatableRead.as_sql(), "REPEATABLE READ");
        assert_eq!(IsolationLevel::Serializable.to_string(), "SERIALIZABLE");
    }
}
