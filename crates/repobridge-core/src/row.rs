//! Rows returned by the store.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// An ordered set of named values.
///
/// Rows coming out of the store are keyed by storage (column) names; the
/// facade re-keys them by property name before handing them to
/// `Entity::from_row`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from name/value pairs.
    pub fn from_pairs<N: Into<String>>(pairs: impl IntoIterator<Item = (N, Value)>) -> Self {
        let mut row = Self::new();
        for (name, value) in pairs {
            row.insert(name, value);
        }
        row
    }

    /// Set a column, replacing any previous value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Look up a value by column name.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Look up a value by column name, cloning it; `Null` when the column is missing.
    pub fn value(&self, name: &str) -> Value {
        self.get_named(name).cloned().unwrap_or(Value::Null)
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over name/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the row, returning its pairs.
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.entries
    }
}
