//! `difference(a, b)`: multiset difference; emits
//! max(0, count_a − count_b) copies. Materializing: buffers the right
//! side fully on construction.

use std::collections::HashMap;

use super::Relation;
use crate::error::Result;
use crate::value::{canonical_key, CanonicalKey, Record, Value};

fn record_key(record: &Record) -> CanonicalKey {
    canonical_key(&Value::Object(record.clone()))
}

pub struct Difference {
    left: Relation,
    subtract: HashMap<CanonicalKey, usize>,
}

impl Difference {
    /// # Errors
    /// Returns the first error encountered while materializing `right`.
    pub fn new(left: Relation, right: Relation) -> Result<Self> {
        let mut subtract: HashMap<CanonicalKey, usize> = HashMap::new();
        for record in right {
            let record = record?;
            *subtract.entry(record_key(&record)).or_insert(0) += 1;
        }
        Ok(Self { left, subtract })
    }
}

impl Iterator for Difference {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.left.next()? {
                Ok(r) => r,
                Err(e) => return Some(Err(e)),
            };
            let key = record_key(&record);
            match self.subtract.get_mut(&key) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                }
                _ => return Some(Ok(record)),
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
    fn emits_excess_copies_only() {
        let a = from_vec(vec![record("x"), record("x"), record("y")]);
        let b = from_vec(vec![record("x")]);
        let out = collect(Box::new(Difference::new(a, b).unwrap())).unwrap();
        assert_eq!(out, vec![record("x"), record("y")]);
    }

    #[test]
    fn difference_from_self_is_empty() {
        let a = from_vec(vec![record("x"), record("y")]);
        let b = from_vec(vec![record("x"), record("y")]);
        let out = collect(Box::new(Difference::new(a, b).unwrap())).unwrap();
        assert!(out.is_empty());
    }
}
