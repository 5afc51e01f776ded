use std::collections::HashMap;

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// The set of variable bindings an expression is evaluated against.
pub type Environment = HashMap<String, Value>;

/// A map key. String keys dominate in practice but integer and boolean
/// keys are also valid; unsigned values normalize to `Int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    String(String),
}

impl MapKey {
    /// Converts a runtime value into a key, or `None` for types that
    /// cannot be hashed consistently (doubles, composites, null).
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(n) => Some(MapKey::Int(*n)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(n) => Value::Int(*n),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for MapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{}", b),
            MapKey::Int(n) => write!(f, "{}", n),
            MapKey::String(s) => write!(f, "{}", s),
        }
    }
}

/// A runtime value.
///
/// Values form a dynamically typed lattice; operations check types when
/// they execute. Unsigned integers have no variant of their own: a
/// `u`-suffixed literal decodes into the signed 64-bit slot and `uint()`
/// rejects negatives at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null
    Null,

    /// Boolean
    Bool(bool),

    /// Signed 64-bit integer
    Int(i64),

    /// Double-precision float
    Double(f64),

    /// UTF-8 string
    String(String),

    /// Byte sequence
    Bytes(Vec<u8>),

    /// Ordered sequence of values
    List(Vec<Value>),

    /// Mapping from key to value
    Map(HashMap<MapKey, Value>),

    /// An instant in time
    Timestamp(DateTime<Utc>),

    /// A span of time
    Duration(Duration),
}

/// A numeric view coercing int and double for mixed arithmetic.
#[derive(Debug, Clone, Copy)]
pub enum Num {
    Int(i64),
    Double(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Double(d) => d,
        }
    }
}

impl Value {
    /// Human-readable type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Timestamp(_) => "timestamp",
            Value::Duration(_) => "duration",
        }
    }

    /// Truthiness: non-zero numbers, non-empty strings/bytes/collections,
    /// and any timestamp or duration count as true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Double(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Timestamp(_) | Value::Duration(_) => true,
        }
    }

    /// Whether this value is the boolean `true`. Logical operators and
    /// macro conditions test exactly this, never truthiness.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Numeric view for arithmetic, `None` for non-numbers.
    pub fn as_num(&self) -> Option<Num> {
        match self {
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Double(d) => Some(Num::Double(*d)),
            _ => None,
        }
    }
}

/// Deep equality with numeric coercion.
///
/// Int and double compare as doubles when either side is a double; lists
/// compare element-wise; maps compare key sets and values regardless of
/// order. Values of different types are unequal, never an error.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::List(l), Value::List(r)) => {
            l.len() == r.len() && l.iter().zip(r.iter()).all(|(a, b)| equals(a, b))
        }
        (Value::Map(l), Value::Map(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(key, value)| r.get(key).is_some_and(|other| equals(value, other)))
        }
        _ => {
            if let (Some(l), Some(r)) = (left.as_num(), right.as_num()) {
                return match (l, r) {
                    (Num::Int(a), Num::Int(b)) => a == b,
                    _ => l.as_f64() == r.as_f64(),
                };
            }
            match (left, right) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::String(a), Value::String(b)) => a == b,
                (Value::Bytes(a), Value::Bytes(b)) => a == b,
                (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
                (Value::Duration(a), Value::Duration(b)) => a == b,
                _ => false,
            }
        }
    }
}

fn fmt_double(f: &mut std::fmt::Formatter<'_>, d: f64) -> std::fmt::Result {
    if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e16 {
        write!(f, "{:.1}", d)
    } else {
        write!(f, "{}", d)
    }
}

impl std::fmt::Display for Value {
    /// Canonical textual form, as produced by the `string()` conversion
    /// and by string concatenation of non-string operands.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(d) => fmt_double(f, *d),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                // Sort keys for deterministic output
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, map[key])?;
                }
                write!(f, "}}")
            }
            Value::Timestamp(t) => {
                write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Duration(d) => write!(f, "{}s", d.num_seconds()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_doubles_keep_a_decimal_point() {
        assert_eq!(Value::Double(5.0).to_string(), "5.0");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Int(5).to_string(), "5");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::List(vec![Value::Null]).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
    }
}
