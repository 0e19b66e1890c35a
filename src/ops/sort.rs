//! `sort(keys, desc?)`: stable sort over dotted paths, ties
//! broken in declaration order, absent values sorting as the
//! type-rank-minimal value, below `null`. Materializing: buffers the
//! whole input.

use std::cmp::Ordering;

use super::Relation;
use crate::error::Result;
use crate::path::{get_path_in_record, Path, Resolved};
use crate::value::Record;

pub struct Sort {
    input: Relation,
    keys: Vec<Path>,
    desc: bool,
}

impl Sort {
    #[must_use]
    pub const fn new(input: Relation, keys: Vec<Path>, desc: bool) -> Self {
        Self { input, keys, desc }
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.keys {
            let ord = match (get_path_in_record(a, key), get_path_in_record(b, key)) {
                (Resolved::Absent, Resolved::Absent) => Ordering::Equal,
                (Resolved::Absent, Resolved::Value(_)) => Ordering::Less,
                (Resolved::Value(_), Resolved::Absent) => Ordering::Greater,
                (Resolved::Value(x), Resolved::Value(y)) => x.value_cmp(y),
            };
            if ord != Ordering::Equal {
                return if self.desc { ord.reverse() } else { ord };
            }
        }
        Ordering::Equal
    }

    /// # Errors
    /// Returns the first error encountered while materializing the
    /// input.
    pub fn collect_sorted(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(item) = self.input.next() {
            records.push(item?);
        }
        records.sort_by(|a, b| self.compare(a, b));
        Ok(records)
    }
}

/// Wrap `Sort` back into a `Relation`, materializing eagerly on the
/// first `next()` call via a buffered iterator.
#[must_use]
pub fn sort_relation(input: Relation, keys: Vec<Path>, desc: bool) -> Relation {
    let sort = Sort::new(input, keys, desc);
    match sort.collect_sorted() {
        Ok(records) => super::from_vec(records),
        Err(e) => Box::new(std::iter::once(Err(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::from_vec;
    use crate::value::Value;
    use indexmap::IndexMap;

    fn record(v: i64) -> Record {
        let mut m = IndexMap::new();
        m.insert("v".to_string(), Value::Int(v));
        m
    }

    #[test]
    fn sorts_ascending_by_default() {
        let input = from_vec(vec![record(3), record(1), record(2)]);
        let out = Sort::new(input, vec![Path::parse("v")], false).collect_sorted().unwrap();
        let values: Vec<i64> = out.iter().map(|r| match r["v"] { Value::Int(n) => n, _ => unreachable!() }).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn is_stable_for_equal_keys() {
        let mut a = IndexMap::new();
        a.insert("v".to_string(), Value::Int(1));
        a.insert("tag".to_string(), Value::String("first".into()));
        let mut b = IndexMap::new();
        b.insert("v".to_string(), Value::Int(1));
        b.insert("tag".to_string(), Value::String("second".into()));
        let input = from_vec(vec![a.clone(), b.clone()]);
        let out = Sort::new(input, vec![Path::parse("v")], false).collect_sorted().unwrap();
        assert_eq!(out[0]["tag"], Value::String("first".into()));
        assert_eq!(out[1]["tag"], Value::String("second".into()));
    }

    #[test]
    fn idempotent() {
        let input = from_vec(vec![record(2), record(1)]);
        let once = Sort::new(input, vec![Path::parse("v")], false).collect_sorted().unwrap();
        let twice = Sort::new(from_vec(once.clone()), vec![Path::parse("v")], false)
            .collect_sorted()
            .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn windowed_approximation_concatenates_per_window_sorts() {
        let values = [4, 2, 6, 1, 3, 5];
        let mut out = Vec::new();
        for chunk in values.chunks(2) {
            let input = from_vec(chunk.iter().map(|&v| record(v)).collect());
            let sorted = Sort::new(input, vec![Path::parse("v")], false).collect_sorted().unwrap();
            out.extend(sorted.into_iter().map(|r| match r["v"] {
                Value::Int(n) => n,
                _ => unreachable!(),
            }));
        }
        assert_eq!(out, vec![2, 4, 1, 6, 3, 5]);
    }
}
