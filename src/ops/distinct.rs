//! `distinct`: maintains a set of seen record hashes,
//! emitting only the first occurrence of each distinct record in
//! first-seen order. Bounded-stateful: O(#unique) memory.

use std::collections::HashSet;

use super::Relation;
use crate::error::Result;
use crate::value::{canonical_key, CanonicalKey, Record, Value};

pub struct Distinct {
    input: Relation,
    seen: HashSet<CanonicalKey>,
}

impl Distinct {
    #[must_use]
    pub fn new(input: Relation) -> Self {
        Self { input, seen: HashSet::new() }
    }
}

fn record_key(record: &Record) -> CanonicalKey {
    canonical_key(&Value::Object(record.clone()))
}

impl Iterator for Distinct {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.input.next()? {
                Ok(r) => r,
                Err(e) => return Some(Err(e)),
            };
            if self.seen.insert(record_key(&record)) {
                return Some(Ok(record));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{collect, from_vec};
    use indexmap::IndexMap;

    fn record(k: &str) -> Record {
        let mut m = IndexMap::new();
        m.insert("k".to_string(), Value::String(k.to_string()));
        m
    }

    #[test]
    fn preserves_first_seen_order() {
        let input = from_vec(vec![record("a"), record("b"), record("a")]);
        let out = collect(Box::new(Distinct::new(input))).unwrap();
        assert_eq!(out, vec![record("a"), record("b")]);
    }

    #[test]
    fn idempotent() {
        let once = collect(Box::new(Distinct::new(from_vec(vec![record("a"), record("a"), record("b")])))).unwrap();
        let twice = collect(Box::new(Distinct::new(from_vec(once.clone())))).unwrap();
        assert_eq!(once, twice);
    }
}
