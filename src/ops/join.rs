//! `join(left, right, on, mode)`: equi-join over dotted
//! paths. Builds a hash index over the right side keyed by the tuple of
//! `r_path` values for each of the `on` pairs (`on` is a list of
//! left-path/right-path pairs, not a single positional pair). For each
//! left record, probes the index and emits the merged record; right
//! keys overwrite left on collision. `mode ∈ {inner, left, right,
//! outer}`; non-inner modes fill missing fields with absent (omitted
//! keys, per the project contract). Materializing: O(|right|) records
//! indexed.

use std::collections::{HashMap, VecDeque};

use super::Relation;
use crate::error::Result;
use crate::path::{get_path_in_record, Path};
use crate::value::{canonical_key, CanonicalKey, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    Inner,
    Left,
    Right,
    Outer,
}

pub struct Join {
    left: Relation,
    on: Vec<(Path, Path)>,
    mode: JoinMode,
    index: HashMap<Vec<CanonicalKey>, Vec<Record>>,
    matched_right: HashMap<Vec<CanonicalKey>, usize>,
    pending: VecDeque<Result<Record>>,
    left_exhausted: bool,
    unmatched_right_emitted: bool,
}

impl Join {
    /// # Errors
    /// Returns the first error encountered while materializing `right`.
    pub fn new(left: Relation, right: Relation, on: Vec<(Path, Path)>, mode: JoinMode) -> Result<Self> {
        let mut index: HashMap<Vec<CanonicalKey>, Vec<Record>> = HashMap::new();
        for record in right {
            let record = record?;
            let key: Vec<CanonicalKey> = on
                .iter()
                .map(|(_, r_path)| key_for(&record, r_path))
                .collect();
            index.entry(key).or_default().push(record);
        }
        Ok(Self {
            left,
            on,
            mode,
            index,
            matched_right: HashMap::new(),
            pending: VecDeque::new(),
            left_exhausted: false,
            unmatched_right_emitted: false,
        })
    }

    fn merge(left: &Record, right: &Record) -> Record {
        let mut out = left.clone();
        for (k, v) in right {
            out.insert(k.clone(), v.clone());
        }
        out
    }

    /// Pull the next left record, probing the index and buffering its
    /// matches (or an absent-filled row) into `pending`. Returns `false`
    /// once the left side is exhausted.
    fn pull_left(&mut self) -> bool {
        let record = match self.left.next() {
            None => {
                self.left_exhausted = true;
                return false;
            }
            Some(Ok(r)) => r,
            Some(Err(e)) => {
                self.pending.push_back(Err(e));
                return true;
            }
        };
        let key: Vec<CanonicalKey> = self
            .on
            .iter()
            .map(|(l_path, _)| key_for(&record, l_path))
            .collect();
        match self.index.get(&key) {
            Some(matches) if !matches.is_empty() => {
                *self.matched_right.entry(key.clone()).or_insert(0) += matches.len();
                for right in matches {
                    self.pending.push_back(Ok(Self::merge(&record, right)));
                }
            }
            _ => {
                if matches!(self.mode, JoinMode::Left | JoinMode::Outer) {
                    self.pending.push_back(Ok(record));
                }
            }
        }
        true
    }

    fn emit_unmatched_right(&mut self) {
        for (key, records) in &self.index {
            let already = self.matched_right.get(key).copied().unwrap_or(0);
            if already < records.len() {
                for right in &records[already..] {
                    self.pending.push_back(Ok(right.clone()));
                }
            }
        }
    }
}

fn key_for(record: &Record, path: &Path) -> CanonicalKey {
    match get_path_in_record(record, path) {
        crate::path::Resolved::Value(v) => canonical_key(v),
        crate::path::Resolved::Absent => canonical_key(&crate::value::Value::Null),
    }
}

impl Iterator for Join {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if !self.left_exhausted {
                if self.pull_left() {
                    continue;
                }
            }
            if matches!(self.mode, JoinMode::Right | JoinMode::Outer) && !self.unmatched_right_emitted {
                self.unmatched_right_emitted = true;
                self.emit_unmatched_right();
                continue;
            }
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{collect, from_vec};
    use crate::value::Value;
    use indexmap::IndexMap;

    fn left_record(id: i64, name: &str) -> Record {
        let mut u = IndexMap::new();
        u.insert("id".to_string(), Value::Int(id));
        let mut m = IndexMap::new();
        m.insert("u".to_string(), Value::Object(u));
        m.insert("name".to_string(), Value::String(name.to_string()));
        m
    }

    fn right_record(cid: i64, x: i64) -> Record {
        let mut m = IndexMap::new();
        m.insert("cid".to_string(), Value::Int(cid));
        m.insert("x".to_string(), Value::Int(x));
        m
    }

    #[test]
    fn equi_join_on_nested_path() {
        let left = from_vec(vec![left_record(1, "A"), left_record(2, "B")]);
        let right = from_vec(vec![right_record(1, 10), right_record(1, 20), right_record(3, 30)]);
        let on = vec![(Path::parse("u.id"), Path::parse("cid"))];
        let out = collect(Box::new(Join::new(left, right, on, JoinMode::Inner).unwrap())).unwrap();
        assert_eq!(out.len(), 2);
        for r in &out {
            assert_eq!(r["name"], Value::String("A".to_string()));
        }
    }

    #[test]
    fn left_join_keeps_unmatched_left_rows() {
        let left = from_vec(vec![left_record(1, "A"), left_record(2, "B")]);
        let right = from_vec(vec![right_record(1, 10)]);
        let on = vec![(Path::parse("u.id"), Path::parse("cid"))];
        let out = collect(Box::new(Join::new(left, right, on, JoinMode::Left).unwrap())).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().any(|r| r["name"] == Value::String("B".to_string()) && !r.contains_key("x")));
    }

    #[test]
    fn outer_join_includes_unmatched_right_rows() {
        let left = from_vec(vec![left_record(1, "A")]);
        let right = from_vec(vec![right_record(1, 10), right_record(9, 99)]);
        let on = vec![(Path::parse("u.id"), Path::parse("cid"))];
        let out = collect(Box::new(Join::new(left, right, on, JoinMode::Outer).unwrap())).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().any(|r| r.get("x") == Some(&Value::Int(99)) && !r.contains_key("name")));
    }
}
