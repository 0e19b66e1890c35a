//! Dotted-path access into records.

use crate::value::{Record, Value};

/// A pre-split dotted path: a nonempty sequence of key tokens. Parsed once
/// and reused across records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(Vec<String>);

impl Path {
    /// Split a dotted-path string on `.`. Names containing `[` are treated
    /// as literal keys by the operator core: array indexing
    /// syntax is only recognized by the virtual-filesystem navigator.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        Self(s.split('.').map(str::to_string).collect())
    }

    #[must_use]
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// The path rendered back as a dotted string, used verbatim as the
    /// output key for grouping fields and unflattened projections.
    #[must_use]
    pub fn as_dotted(&self) -> String {
        self.0.join(".")
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_dotted())
    }
}

/// The result of resolving a path: either a value, or the distinguished
/// absent marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    Value(&'a Value),
    Absent,
}

impl<'a> Resolved<'a> {
    #[must_use]
    pub const fn value(self) -> Option<&'a Value> {
        match self {
            Resolved::Value(v) => Some(v),
            Resolved::Absent => None,
        }
    }

    #[must_use]
    pub const fn is_absent(self) -> bool {
        matches!(self, Resolved::Absent)
    }
}

/// Resolve a dotted path against a record. At each step, if the current
/// value is not a mapping, the path resolves to `Absent`. Never raises.
#[must_use]
pub fn get_path<'a>(record: &'a Value, path: &Path) -> Resolved<'a> {
    let mut current = record;
    for key in path.tokens() {
        match current {
            Value::Object(map) => match map.get(key) {
                Some(v) => current = v,
                None => return Resolved::Absent,
            },
            _ => return Resolved::Absent,
        }
    }
    Resolved::Value(current)
}

/// Convenience for record maps directly (the common case: `Record` is
/// `IndexMap<String, Value>`, not a `Value::Object` itself).
#[must_use]
pub fn get_path_in_record<'a>(record: &'a Record, path: &Path) -> Resolved<'a> {
    let Some(first) = path.tokens().first() else {
        return Resolved::Absent;
    };
    match record.get(first) {
        None => Resolved::Absent,
        Some(v) if path.tokens().len() == 1 => Resolved::Value(v),
        Some(v) => get_path(v, &Path::from_tokens(path.tokens()[1..].to_vec())),
    }
}

/// Assign a value at a dotted path, creating nested mappings as needed.
/// Overwrites non-mappings along the way only because the caller
/// explicitly asked for nested assignment (structured projection output);
/// plain flat-key projection never calls this and instead inserts the
/// dotted string as a literal key.
pub fn set_path_nested(record: &mut Record, path: &Path, value: Value) {
    let tokens = path.tokens();
    if tokens.is_empty() {
        return;
    }
    if tokens.len() == 1 {
        record.insert(tokens[0].clone(), value);
        return;
    }
    let mut current = record
        .entry(tokens[0].clone())
        .or_insert_with(|| Value::Object(Record::new()));
    for key in &tokens[1..tokens.len() - 1] {
        if !matches!(current, Value::Object(_)) {
            *current = Value::Object(Record::new());
        }
        let Value::Object(map) = current else {
            unreachable!()
        };
        current = map.entry(key.clone()).or_insert_with(|| Value::Object(Record::new()));
    }
    if !matches!(current, Value::Object(_)) {
        *current = Value::Object(Record::new());
    }
    let Value::Object(map) = current else {
        unreachable!()
    };
    map.insert(tokens[tokens.len() - 1].clone(), value);
}

/// Insert a value under a literal flat key (may itself contain dots).
pub fn set_flat(record: &mut Record, key: &str, value: Value) {
    record.insert(key.to_string(), value);
}
