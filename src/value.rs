//! The JSON value model.
//!
//! `Value` mirrors `serde_json::Value`'s shape but is defined locally so
//! that integer/float unification and a canonical hash can be enforced at
//! the equality layer instead of inherited from `serde_json`'s own
//! `PartialEq`, which treats `1` and `1.0` as distinct.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

/// A JSON value. Objects preserve key insertion order (`IndexMap`) so that
/// output stability holds without a separate re-sort pass.
///
/// Constructed from `serde_json::Value` at the I/O boundary (see `From`
/// impls below) rather than derived directly: an untagged
/// `serde(Deserialize)` cannot distinguish `Int` from `Float` reliably,
/// and the boundary conversion lets us make that call from
/// `serde_json::Number` explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

/// A record is a top-level object value.
pub type Record = IndexMap<String, Value>;

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Truthiness used by the filter expression engine: any
    /// value may appear as a top-level `select` predicate result.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(items) => !items.is_empty(),
            Self::Object(map) => !map.is_empty(),
        }
    }

    /// A fixed type rank used for cross-type ordering:
    /// null < boolean < number < string < array < object.
    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
            Self::Array(_) => 4,
            Self::Object(_) => 5,
        }
    }

    /// Structural equality with integer/float unification: an integer `n`
    /// equals a float `f` iff `f == n` exactly (no NaNs equal).
    #[must_use]
    pub fn value_eq(&self, other: &Self) -> bool {
        if matches!(self, Self::Float(f) if f.is_nan()) || matches!(other, Self::Float(f) if f.is_nan()) {
            return false;
        }
        self.value_cmp(other) == Ordering::Equal
    }

    /// Total ordering over `Value`. Cross-type comparisons
    /// fall back to `type_rank`; within a type, the natural ordering
    /// applies. Arrays and objects compare lexicographically by
    /// elements/keys; objects compare by sorted keys for ordering
    /// regardless of insertion order.
    #[must_use]
    pub fn value_cmp(&self, other: &Self) -> Ordering {
        use Value::{Array, Bool, Float, Int, Null, Object, String as Str};

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Str(a), Str(b)) => a.cmp(b),
            (Array(a), Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.value_cmp(y))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Object(a), Object(b)) => {
                let mut ak: Vec<&String> = a.keys().collect();
                let mut bk: Vec<&String> = b.keys().collect();
                ak.sort_unstable();
                bk.sort_unstable();
                for (k1, k2) in ak.iter().zip(bk.iter()) {
                    let c = k1.cmp(k2);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                let len_cmp = ak.len().cmp(&bk.len());
                if len_cmp != Ordering::Equal {
                    return len_cmp;
                }
                for k in ak {
                    let c = a[k].value_cmp(&b[k]);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                Ordering::Equal
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Array(_) | Self::Object(_) => {
                let json: serde_json::Value = self.clone().into();
                let text = serde_json::to_string(&json).unwrap_or_default();
                write!(f, "{text}")
            }
        }
    }
}

/// A canonical binary-ish key for a `Value`, used by `distinct`,
/// `intersection`, `difference`, join indexing, and `group_by` bucketing.
/// Two values that are `value_eq` always produce an equal `CanonicalKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalKey {
    Null,
    Bool(bool),
    /// Numbers are canonicalized through their bit pattern so that `1`
    /// and `1.0` collide (both become `Number(1.0_f64.to_bits())`), but
    /// non-integral floats keep their own distinct encoding.
    Number(u64),
    String(String),
    Array(Vec<CanonicalKey>),
    Object(Vec<(String, CanonicalKey)>),
}

/// Build the canonical key for a value.
#[must_use]
pub fn canonical_key(value: &Value) -> CanonicalKey {
    match value {
        Value::Null => CanonicalKey::Null,
        Value::Bool(b) => CanonicalKey::Bool(*b),
        Value::Int(n) => CanonicalKey::Number(normalize_float(*n as f64).to_bits()),
        Value::Float(f) => CanonicalKey::Number(normalize_float(*f).to_bits()),
        Value::String(s) => CanonicalKey::String(s.clone()),
        Value::Array(items) => CanonicalKey::Array(items.iter().map(canonical_key).collect()),
        Value::Object(map) => {
            let mut pairs: Vec<(String, CanonicalKey)> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonical_key(v)))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            CanonicalKey::Object(pairs)
        }
    }
}

/// Canonical key for a negative-zero-aware float needs `-0.0` and `0.0`
/// to collide, which `f64::to_bits` alone would not give us; normalize
/// before taking bits.
#[must_use]
pub fn normalize_float(f: f64) -> f64 {
    if f == 0.0 {
        0.0
    } else {
        f
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(n) => Self::Number(n.into()),
            Value::Float(f) => {
                serde_json::Number::from_f64(f).map_or(Self::Null, Self::Number)
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_float_equality() {
        assert!(Value::Int(1).value_eq(&Value::Float(1.0)));
        assert!(!Value::Int(1).value_eq(&Value::Float(1.1)));
    }

    #[test]
    fn nan_never_equal() {
        let nan = Value::Float(f64::NAN);
        assert!(!nan.value_eq(&nan));
    }

    #[test]
    fn type_rank_ordering() {
        assert_eq!(Value::Null.value_cmp(&Value::Bool(false)), Ordering::Less);
        assert_eq!(
            Value::Bool(true).value_cmp(&Value::Int(0)),
            Ordering::Less
        );
        assert_eq!(
            Value::Int(5).value_cmp(&Value::String(String::new())),
            Ordering::Less
        );
    }

    #[test]
    fn bool_ordering_false_lt_true() {
        assert_eq!(Value::Bool(false).value_cmp(&Value::Bool(true)), Ordering::Less);
    }

    #[test]
    fn canonical_key_unifies_int_and_float() {
        assert_eq!(canonical_key(&Value::Int(2)), canonical_key(&Value::Float(2.0)));
    }

    #[test]
    fn canonical_key_object_independent_of_key_order() {
        let mut a = IndexMap::new();
        a.insert("x".to_string(), Value::Int(1));
        a.insert("y".to_string(), Value::Int(2));
        let mut b = IndexMap::new();
        b.insert("y".to_string(), Value::Int(2));
        b.insert("x".to_string(), Value::Int(1));
        assert_eq!(canonical_key(&Value::Object(a)), canonical_key(&Value::Object(b)));
    }
}
