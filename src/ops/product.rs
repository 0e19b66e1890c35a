//! `product(a, b)`: cartesian product, for each `r_a` in
//! `a`, for each `r_b` in `b`. Materializing: buffers the right side
//! fully on construction since it is replayed once per left record.

use super::Relation;
use crate::error::Result;
use crate::value::{Record, Value};

pub struct Product {
    left: Relation,
    right: Vec<Record>,
    current_left: Option<Record>,
    right_index: usize,
}

impl Product {
    /// # Errors
    /// Returns the first error encountered while materializing `right`.
    pub fn new(left: Relation, right: Relation) -> Result<Self> {
        let right: Vec<Record> = right.collect::<Result<Vec<_>>>()?;
        Ok(Self { left, right, current_left: None, right_index: 0 })
    }

    fn merge(left: &Record, right: &Record) -> Record {
        let mut out = left.clone();
        for (k, v) in right {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

impl Iterator for Product {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.right.is_empty() {
                return None;
            }
            if self.current_left.is_none() {
                match self.left.next()? {
                    Ok(r) => {
                        self.current_left = Some(r);
                        self.right_index = 0;
                    }
                    Err(e) => return Some(Err(e)),
                }
            }
            let left = self.current_left.as_ref()?;
            if self.right_index >= self.right.len() {
                self.current_left = None;
                continue;
            }
            let right = &self.right[self.right_index];
            let merged = Self::merge(left, right);
            self.right_index += 1;
            return Some(Ok(merged));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{collect, from_vec};
    use indexmap::IndexMap;

    fn record(k: &str, v: i64) -> Record {
        let mut m = IndexMap::new();
        m.insert(k.to_string(), Value::Int(v));
        m
    }

    #[test]
    fn order_is_for_each_left_for_each_right() {
        let a = from_vec(vec![record("a", 1), record("a", 2)]);
        let b = from_vec(vec![record("b", 10), record("b", 20)]);
        let out = collect(Box::new(Product::new(a, b).unwrap())).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["a"], Value::Int(1));
        assert_eq!(out[0]["b"], Value::Int(10));
        assert_eq!(out[1]["b"], Value::Int(20));
        assert_eq!(out[2]["a"], Value::Int(2));
    }
}
