//! Dynamic column values exchanged with the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single column value.
///
/// Values flow in both directions: entities render themselves into values
/// (`Entity::to_values`) and are rebuilt from rows of values (`Entity::from_row`).
/// The query translator only ever compares and copies values, it never
/// interprets them beyond the declared `SqlType`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// SQL NULL / absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    BigInt(i64),
    /// Double precision float.
    Double(f64),
    /// Arbitrary precision decimal kept as its textual form.
    Decimal(String),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Timestamp in microseconds since the Unix epoch.
    Timestamp(i64),
    /// UUID in its canonical hyphenated text form.
    Uuid(String),
    /// JSON document.
    Json(serde_json::Value),
    /// Array of values.
    Array(Vec<Value>),
}

impl Value {
    /// True for `Value::Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text content of `Text`, `Decimal` and `Uuid` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) | Value::Uuid(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of integral values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::BigInt(i) | Value::Timestamp(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean view.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short variant name, used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BYTES",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
            Value::Array(_) => "ARRAY",
        }
    }

    /// Stable textual key for this value, suitable for external key-value stores.
    ///
    /// Integral variants share one encoding so `Int(42)` and `BigInt(42)` address
    /// the same cache entry.
    pub fn key_string(&self) -> String {
        match self {
            Value::Int(_) | Value::BigInt(_) => {
                format!("i:{}", self.as_i64().unwrap_or_default())
            }
            Value::Text(s) => format!("s:{s}"),
            Value::Uuid(s) => format!("u:{s}"),
            other => format!("j:{}", serde_json::to_string(other).unwrap_or_default()),
        }
    }

    /// Equality that treats integral variants as interchangeable.
    pub fn key_eq(&self, other: &Value) -> bool {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b))
                if !matches!(self, Value::Timestamp(_)) && !matches!(other, Value::Timestamp(_)) =>
            {
                a == b
            }
            _ => self == other,
        }
    }
}

/// Hash a slice of key values into a single identity hash.
///
/// Integral values hash identically regardless of width, matching `Value::key_eq`.
pub fn hash_values(values: &[Value]) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    for v in values {
        hash_value(v, &mut hasher);
    }
    hasher.finish()
}

/// Hash a single value into the hasher.
pub fn hash_value(v: &Value, hasher: &mut impl Hasher) {
    match v {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Int(i) => {
            2u8.hash(hasher);
            i64::from(*i).hash(hasher);
        }
        Value::BigInt(i) => {
            2u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Double(f) => {
            3u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Decimal(s) => {
            4u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Text(s) => {
            5u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            6u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Timestamp(ts) => {
            7u8.hash(hasher);
            ts.hash(hasher);
        }
        Value::Uuid(u) => {
            8u8.hash(hasher);
            u.hash(hasher);
        }
        Value::Json(j) => {
            9u8.hash(hasher);
            j.to_string().hash(hasher);
        }
        Value::Array(arr) => {
            10u8.hash(hasher);
            arr.len().hash(hasher);
            for item in arr {
                hash_value(item, hasher);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::BigInt(i) | Value::Timestamp(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Decimal(s) => f.write_str(s),
            Value::Text(s) | Value::Uuid(s) => write!(f, "'{s}'"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Json(j) => write!(f, "{j}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
