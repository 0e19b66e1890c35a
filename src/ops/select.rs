//! `select(expr)`: emits each input record for which `expr` is
//! truthy; preserves order and duplicates. Streaming, O(1) memory.

use super::Relation;
use crate::error::{Error, Result};
use crate::expr::{EvalValue, FilterExpr, JmespathQuery};
use crate::value::Record;

/// Per-record evaluation failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalPolicy {
    /// `EvalError`s are pipeline-fatal.
    Strict,
    /// Rows that error are dropped and counted; the pipeline continues.
    Lenient,
}

/// The predicate used by `select`: the default filter sub-language, or
/// the opt-in JMESPath advanced query.
pub enum Predicate {
    Filter(FilterExpr),
    Jmespath(JmespathQuery),
}

pub struct Select {
    input: Relation,
    predicate: Predicate,
    policy: EvalPolicy,
    pub dropped: usize,
}

impl Select {
    #[must_use]
    pub const fn new(input: Relation, predicate: Predicate, policy: EvalPolicy) -> Self {
        Self { input, predicate, policy, dropped: 0 }
    }

    fn matches(&self, record: &Record) -> Result<bool> {
        match &self.predicate {
            Predicate::Filter(f) => Ok(f.matches(record)?),
            Predicate::Jmespath(q) => Ok(q.is_truthy(record)?),
        }
    }
}

impl Iterator for Select {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.input.next()? {
                Ok(r) => r,
                Err(e) => return Some(Err(e)),
            };
            match self.matches(&record) {
                Ok(true) => return Some(Ok(record)),
                Ok(false) => continue,
                Err(e) => match self.policy {
                    EvalPolicy::Strict => return Some(Err(e)),
                    EvalPolicy::Lenient => {
                        self.dropped += 1;
                        continue;
                    }
                },
            }
        }
    }
}

/// Truthiness check helper shared with projection's general evaluation
/// (re-exported since `FilterExpr::matches` already folds this in, but
/// some callers need the raw `EvalValue`).
#[must_use]
pub fn is_truthy(value: &EvalValue) -> bool {
    value.is_truthy_value()
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
    fn filters_and_preserves_order() {
        let input = from_vec(vec![record(1), record(2), record(3)]);
        let expr = FilterExpr::compile("a > 1").unwrap();
        let select = Select::new(input, Predicate::Filter(expr), EvalPolicy::Strict);
        let out: Vec<i64> = select
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .map(|r| match r["a"] {
                Value::Int(n) => n,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(out, vec![2, 3]);
    }

    #[test]
    fn lenient_mode_drops_errored_rows() {
        let input = from_vec(vec![record(0), record(5)]);
        let expr = FilterExpr::compile("10 / a > 1").unwrap();
        let mut select = Select::new(input, Predicate::Filter(expr), EvalPolicy::Lenient);
        let out: Vec<_> = (&mut select).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(select.dropped, 1);
    }

    #[test]
    fn strict_mode_propagates_eval_error() {
        let input = from_vec(vec![record(0)]);
        let expr = FilterExpr::compile("10 / a > 1").unwrap();
        let mut select = Select::new(input, Predicate::Filter(expr), EvalPolicy::Strict);
        assert!(select.next().unwrap().is_err());
    }
}
