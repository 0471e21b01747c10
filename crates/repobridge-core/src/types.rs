//! Declared storage types for entity properties.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Storage type declared on a property.
///
/// The mapping layer never converts values; the declared type exists so that
/// example probes and explicit filters can be checked before a query reaches
/// the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Decimal,
    Text,
    Bytes,
    Timestamp,
    Uuid,
    Json,
    Array,
    /// Value object stored inline with its owner (embedded properties).
    Embedded,
    /// Reference to another entity (association properties).
    Reference,
}

impl SqlType {
    /// Name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE",
            SqlType::Decimal => "DECIMAL",
            SqlType::Text => "TEXT",
            SqlType::Bytes => "BYTES",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Uuid => "UUID",
            SqlType::Json => "JSON",
            SqlType::Array => "ARRAY",
            SqlType::Embedded => "EMBEDDED",
            SqlType::Reference => "REFERENCE",
        }
    }

    /// True if text matchers (prefix, suffix, contains, regex) make sense for this type.
    pub const fn is_textual(self) -> bool {
        matches!(self, SqlType::Text | SqlType::Uuid | SqlType::Decimal)
    }

    /// Whether a value of this shape can be stored in a property of this type.
    ///
    /// `Null` is accepted by every type. Integers widen into wider numeric types.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (SqlType::Boolean, Value::Bool(_)) => true,
            (SqlType::Integer, Value::Int(_)) => true,
            (SqlType::BigInt, Value::Int(_) | Value::BigInt(_)) => true,
            (SqlType::Double, Value::Int(_) | Value::BigInt(_) | Value::Double(_)) => true,
            (SqlType::Decimal, Value::Decimal(_) | Value::Int(_) | Value::BigInt(_)) => true,
            (SqlType::Text, Value::Text(_)) => true,
            (SqlType::Bytes, Value::Bytes(_)) => true,
            (SqlType::Timestamp, Value::Timestamp(_)) => true,
            (SqlType::Uuid, Value::Uuid(_) | Value::Text(_)) => true,
            (SqlType::Json | SqlType::Embedded, Value::Json(_)) => true,
            (SqlType::Array, Value::Array(_)) => true,
            (SqlType::Reference, _) => true,
            _ => false,
        }
    }

    /// The canonical form of an accepted value.
    ///
    /// Every shape `accepts` lets through for this type maps to one variant,
    /// so equal keys given in different shapes compare and hash the same.
    pub fn canonical(self, value: &Value) -> Value {
        match (self, value) {
            (SqlType::BigInt, Value::Int(i)) => Value::BigInt(i64::from(*i)),
            (SqlType::Double, Value::Int(i)) => Value::Double(f64::from(*i)),
            (SqlType::Double, Value::BigInt(i)) => Value::Double(*i as f64),
            (SqlType::Decimal, Value::Int(i)) => Value::Decimal(i.to_string()),
            (SqlType::Decimal, Value::BigInt(i)) => Value::Decimal(i.to_string()),
            (SqlType::Uuid, Value::Text(s)) => Value::Uuid(s.clone()),
            _ => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_null_everywhere() {
        assert!(SqlType::Integer.accepts(&Value::Null));
        assert!(SqlType::Text.accepts(&Value::Null));
    }

    #[test]
    fn test_numeric_widening() {
        assert!(SqlType::BigInt.accepts(&Value::Int(1)));
        assert!(SqlType::Double.accepts(&Value::BigInt(1)));
        assert!(!SqlType::Integer.accepts(&Value::BigInt(1)));
    }

    #[test]
    fn test_canonical_keys() {
        assert_eq!(
            SqlType::Uuid.canonical(&Value::Text("6f1c".into())),
            Value::Uuid("6f1c".into())
        );
        assert_eq!(
            SqlType::Decimal.canonical(&Value::BigInt(12)),
            Value::Decimal("12".into())
        );
        assert_eq!(SqlType::Double.canonical(&Value::Int(2)), Value::Double(2.0));
        assert_eq!(SqlType::BigInt.canonical(&Value::Int(7)), Value::BigInt(7));
        assert_eq!(SqlType::Text.canonical(&Value::Text("a".into())), Value::Text("a".into()));
        assert_eq!(SqlType::Uuid.canonical(&Value::Null), Value::Null);
    }

    #[test]
    fn test_mismatch() {
        assert!(!SqlType::Text.accepts(&Value::Int(3)));
        assert!(!SqlType::Boolean.accepts(&Value::Text("true".into())));
    }
}
