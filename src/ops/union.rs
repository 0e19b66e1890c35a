//! `union(lhs, rhs)`: plain multiset
//! concatenation, no deduplication — `distinct` is the explicit
//! deduplicator. Streaming, O(1) memory.

use super::Relation;
use crate::error::Result;
use crate::value::Record;

pub struct Union {
    lhs: Relation,
    rhs: Relation,
    lhs_done: bool,
}

impl Union {
    #[must_use]
    pub const fn new(lhs: Relation, rhs: Relation) -> Self {
        Self { lhs, rhs, lhs_done: false }
    }
}

impl Iterator for Union {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.lhs_done {
            if let Some(item) = self.lhs.next() {
                return Some(item);
            }
            self.lhs_done = true;
        }
        self.rhs.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::from_vec;
    use crate::value::Value;
    use indexmap::IndexMap;

    fn record(a: i64) -> Record {
        let mut m = IndexMap::new();
        m.insert("a".to_string(), Value::Int(a));
        m
    }

    #[test]
    fn concatenates_without_dedup() {
        let lhs = from_vec(vec![record(1), record(2)]);
        let rhs = from_vec(vec![record(1), record(3)]);
        let out = Union::new(lhs, rhs).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn is_associative() {
        let a = from_vec(vec![record(1)]);
        let b = from_vec(vec![record(2)]);
        let c = from_vec(vec![record(3)]);
        let left: Relation = Box::new(Union::new(a, b));
        let left_then_c = Union::new(left, c).collect::<Result<Vec<_>>>().unwrap();

        let a2 = from_vec(vec![record(1)]);
        let b2 = from_vec(vec![record(2)]);
        let c2 = from_vec(vec![record(3)]);
        let right: Relation = Box::new(Union::new(b2, c2));
        let a_then_right = Union::new(a2, right).collect::<Result<Vec<_>>>().unwrap();

        assert_eq!(left_then_c, a_then_right);
    }
}
