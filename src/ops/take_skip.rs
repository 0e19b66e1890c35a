//! `take(n)` / `skip(n)`: streaming operators exercising
//! early termination. O(1) memory.

use super::Relation;
use crate::error::Result;
use crate::value::Record;

pub struct Take {
    input: Relation,
    remaining: usize,
}

impl Take {
    #[must_use]
    pub const fn new(input: Relation, n: usize) -> Self {
        Self { input, remaining: n }
    }
}

impl Iterator for Take {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.input.next()
    }
}

pub struct Skip {
    input: Relation,
    remaining: usize,
}

impl Skip {
    #[must_use]
    pub const fn new(input: Relation, n: usize) -> Self {
        Self { input, remaining: n }
    }
}

impl Iterator for Skip {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            self.remaining -= 1;
            match self.input.next() {
                Some(Ok(_)) => {}
                Some(Err(e)) => return Some(Err(e)),
                None => return None,
            }
        }
        self.input.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{collect, from_vec};
    use crate::value::Value;
    use indexmap::IndexMap;

    fn record(a: i64) -> Record {
        let mut m = IndexMap::new();
        m.insert("a".to_string(), Value::Int(a));
        m
    }

    #[test]
    fn take_limits_output() {
        let input = from_vec(vec![record(1), record(2), record(3)]);
        let out = collect(Box::new(Take::new(input, 2))).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn take_stops_pulling_upstream() {
        let input = from_vec(vec![record(1), record(2), record(3)]);
        let mut take = Take::new(input, 1);
        assert!(take.next().is_some());
        assert!(take.next().is_none());
    }

    #[test]
    fn skip_drops_leading_records() {
        let input = from_vec(vec![record(1), record(2), record(3)]);
        let out = collect(Box::new(Skip::new(input, 2))).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["a"], Value::Int(3));
    }
}
