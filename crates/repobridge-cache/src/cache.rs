//! The entity cache contract and the no-op backend.

use repobridge_core::{Row, Value};

/// Entity-level cache keyed by (region, identifier).
///
/// Regions are entity names. Entries are stored as property-keyed rows so
/// any backend can hold them, remote ones included.
///
/// Every backend must be safe for concurrent use, and must never report a
/// backend failure to the caller: a failing read is a miss and a failing
/// write is dropped.
pub trait EntityCache: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    fn get(&self, region: &str, key: &Value) -> Option<Row>;

    /// Store a row. Called by `put` with present values only.
    fn store(&self, region: &str, key: &Value, row: Row);

    /// Store `row`, or invalidate the key when there is no row.
    fn put(&self, region: &str, key: &Value, row: Option<Row>) {
        match row {
            Some(row) => self.store(region, key, row),
            None => self.invalidate(region, key),
        }
    }

    fn contains(&self, region: &str, key: &Value) -> bool;

    /// Drop one entry. Dropping an absent entry is a no-op.
    fn invalidate(&self, region: &str, key: &Value);

    /// Drop every entry of a region.
    fn invalidate_all(&self, region: &str);

    /// Drop everything.
    fn clear(&self);
}

/// Caches nothing. Every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl EntityCache for NoOpCache {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn get(&self, _region: &str, _key: &Value) -> Option<Row> {
        None
    }

    fn store(&self, _region: &str, _key: &Value, _row: Row) {}

    fn contains(&self, _region: &str, _key: &Value) -> bool {
        false
    }

    fn invalidate(&self, _region: &str, _key: &Value) {}

    fn invalidate_all(&self, _region: &str) {}

    fn clear(&self) {}
}
