//! `intersection(a, b)`: multiset intersection by structural
//! equality; emits min(count_a, count_b) copies. Materializing: buffers
//! the right side fully on construction.

use std::collections::HashMap;

use super::Relation;
use crate::error::Result;
use crate::value::{canonical_key, CanonicalKey, Record, Value};

fn record_key(record: &Record) -> CanonicalKey {
    canonical_key(&Value::Object(record.clone()))
}

pub struct Intersection {
    left: Relation,
    remaining: HashMap<CanonicalKey, usize>,
}

impl Intersection {
    /// # Errors
    /// Returns the first error encountered while materializing `right`.
    pub fn new(left: Relation, right: Relation) -> Result<Self> {
        let mut remaining: HashMap<CanonicalKey, usize> = HashMap::new();
        for record in right {
            let record = record?;
            *remaining.entry(record_key(&record)).or_insert(0) += 1;
        }
        Ok(Self { left, remaining })
    }
}

impl Iterator for Intersection {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.left.next()? {
                Ok(r) => r,
                Err(e) => return Some(Err(e)),
            };
            let key = record_key(&record);
            if let Some(count) = self.remaining.get_mut(&key) {
                if *count > 0 {
                    *count -= 1;
                    return Some(Ok(record));
                }
            }
        }
    }
}
