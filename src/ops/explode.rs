//! `explode(path)`: where the value at `path` is an array,
//! emits one record per element, replacing the value at `path` with
//! that element. If the value is absent or not an array, the documented
//! default policy passes the record through unchanged, emitting a
//! warning. Streaming, O(1) memory (buffers at most one exploded
//! record's elements).

use std::collections::VecDeque;

use super::Relation;
use crate::error::Result;
use crate::path::{get_path_in_record, Path};
use crate::value::{Record, Value};

pub struct Explode {
    input: Relation,
    path: Path,
    pending: VecDeque<Record>,
    pub warnings: usize,
}

impl Explode {
    #[must_use]
    pub fn new(input: Relation, path: Path) -> Self {
        Self { input, path, pending: VecDeque::new(), warnings: 0 }
    }

    fn explode_one(&mut self, record: Record) {
        match get_path_in_record(&record, &self.path) {
            crate::path::Resolved::Value(Value::Array(items)) => {
                let items = items.clone();
                for item in items {
                    let mut out = record.clone();
                    set_at_top(&mut out, &self.path, item);
                    self.pending.push_back(out);
                }
            }
            _ => {
                self.warnings += 1;
                self.pending.push_back(record);
            }
        }
    }
}

/// Replace the value at a path within a record, assuming the path
/// already resolved against it (so intermediate mappings exist).
fn set_at_top(record: &mut Record, path: &Path, value: Value) {
    let tokens = path.tokens();
    if tokens.len() == 1 {
        record.insert(tokens[0].clone(), value);
        return;
    }
    let Some(Value::Object(map)) = record.get_mut(&tokens[0]) else {
        return;
    };
    set_at_top_nested(map, &tokens[1..], value);
}

fn set_at_top_nested(map: &mut crate::value::Record, tokens: &[String], value: Value) {
    if tokens.len() == 1 {
        map.insert(tokens[0].clone(), value);
        return;
    }
    if let Some(Value::Object(inner)) = map.get_mut(&tokens[0]) {
        set_at_top_nested(inner, &tokens[1..], value);
    }
}

impl Iterator for Explode {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            match self.input.next()? {
                Ok(record) => self.explode_one(record),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::from_vec;
    use indexmap::IndexMap;

    fn record(pairs: Vec<(&str, Value)>) -> Record {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<IndexMap<_, _>>()
    }

    #[test]
    fn array_field_explodes_one_record_per_element() {
        let input = from_vec(vec![record(vec![
            ("tags", Value::Array(vec![Value::Int(1), Value::Int(2)])),
        ])]);
        let mut explode = Explode::new(input, Path::parse("tags"));
        let out = (&mut explode).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["tags"], Value::Int(1));
        assert_eq!(out[1]["tags"], Value::Int(2));
        assert_eq!(explode.warnings, 0);
    }

    #[test]
    fn non_array_field_passes_through_with_warning() {
        let input = from_vec(vec![record(vec![("tags", Value::Int(5))])]);
        let mut explode = Explode::new(input, Path::parse("tags"));
        let out = (&mut explode).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["tags"], Value::Int(5));
        assert_eq!(explode.warnings, 1);
    }
}
