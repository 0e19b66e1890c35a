//! `rename(mapping)`: renames fields by dotted path, leaving
//! all other fields untouched. Streaming, O(1) memory.

use std::collections::{HashMap, HashSet};

use super::{PipelineError, Relation};
use crate::error::Result;
use crate::path::Path;
use crate::value::{Record, Value};

pub struct Rename {
    input: Relation,
    mapping: Vec<(Path, String)>,
    strict: bool,
}

impl Rename {
    /// # Errors
    /// Returns `PipelineError::DuplicateRenameSource` if a source path
    /// is renamed more than once, or `PipelineError::RenameCollision` if
    /// two sources are renamed to the same target.
    pub fn new(
        input: Relation,
        mapping: Vec<(Path, String)>,
        strict: bool,
    ) -> std::result::Result<Self, PipelineError> {
        let mut sources = HashSet::new();
        let mut targets = HashSet::new();
        for (source, target) in &mapping {
            if !sources.insert(source.as_dotted()) {
                return Err(PipelineError::DuplicateRenameSource(source.as_dotted()));
            }
            if !targets.insert(target.clone()) {
                return Err(PipelineError::RenameCollision(target.clone()));
            }
        }
        Ok(Self { input, mapping, strict })
    }

    /// Only top-level-key renames are field renames proper; dotted
    /// sources rename the terminal key within the nested map the rest of
    /// their path addresses. Keys not named in the mapping pass through
    /// unchanged, in their original relative order. In strict mode, a
    /// source path absent from the record is a `PipelineError`.
    fn rename_one(&self, record: Record) -> std::result::Result<Record, PipelineError> {
        let mut out = record;

        for (path, target) in &self.mapping {
            let tokens = path.tokens();
            if tokens.len() > 1 {
                let found = rename_nested_terminal(&mut out, tokens, target);
                if !found && self.strict {
                    return Err(PipelineError::UnknownRenameTarget(path.as_dotted()));
                }
            } else if self.strict && !out.contains_key(tokens[0].as_str()) {
                return Err(PipelineError::UnknownRenameTarget(path.as_dotted()));
            }
        }

        let rename_top: HashMap<&str, &str> = self
            .mapping
            .iter()
            .filter(|(p, _)| p.tokens().len() == 1)
            .map(|(p, t)| (p.tokens()[0].as_str(), t.as_str()))
            .collect();

        let mut result = Record::new();
        for (key, value) in out {
            if let Some(target) = rename_top.get(key.as_str()) {
                result.insert((*target).to_string(), value);
            } else {
                result.insert(key, value);
            }
        }
        Ok(result)
    }
}

/// Rename the terminal key of a dotted path in place, preserving the
/// relative order of the other keys in its immediate parent map.
/// Returns `false` without modifying `record` if any step of `tokens`
/// (including the terminal key itself) is absent or steps through a
/// non-object value.
fn rename_nested_terminal(record: &mut Record, tokens: &[String], new_key: &str) -> bool {
    let Some((last, parents)) = tokens.split_last() else {
        return false;
    };
    let Some(mut current) = record.get_mut(parents[0].as_str()) else {
        return false;
    };
    for key in &parents[1..] {
        current = match current {
            Value::Object(map) => match map.get_mut(key.as_str()) {
                Some(v) => v,
                None => return false,
            },
            _ => return false,
        };
    }
    let Value::Object(map) = current else {
        return false;
    };
    if !map.contains_key(last.as_str()) {
        return false;
    }
    let mut rebuilt = Record::new();
    for (key, value) in std::mem::take(map) {
        if key == *last {
            rebuilt.insert(new_key.to_string(), value);
        } else {
            rebuilt.insert(key, value);
        }
    }
    *map = rebuilt;
    true
}

impl Iterator for Rename {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.input.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };
        Some(self.rename_one(record).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::from_vec;
    use crate::value::Value;
    use indexmap::IndexMap;

    fn record(pairs: Vec<(&str, Value)>) -> Record {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<IndexMap<_, _>>()
    }

    #[test]
    fn renames_top_level_field_and_preserves_others() {
        let input = from_vec(vec![record(vec![("a", Value::Int(1)), ("b", Value::Int(2))])]);
        let rename = Rename::new(input, vec![(Path::parse("a"), "x".to_string())], false).unwrap();
        let out = rename.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(out[0].get("x"), Some(&Value::Int(1)));
        assert_eq!(out[0].get("b"), Some(&Value::Int(2)));
        assert!(!out[0].contains_key("a"));
    }

    #[test]
    fn duplicate_source_is_rejected() {
        let input = from_vec(vec![]);
        let mapping = vec![
            (Path::parse("a"), "x".to_string()),
            (Path::parse("a"), "y".to_string()),
        ];
        assert!(Rename::new(input, mapping, false).is_err());
    }

    #[test]
    fn target_collision_is_rejected() {
        let input = from_vec(vec![]);
        let mapping = vec![
            (Path::parse("a"), "x".to_string()),
            (Path::parse("b"), "x".to_string()),
        ];
        assert!(Rename::new(input, mapping, false).is_err());
    }

    #[test]
    fn dotted_source_renames_terminal_key_in_place() {
        let mut inner = IndexMap::new();
        inner.insert("name".to_string(), Value::String("ann".to_string()));
        inner.insert("age".to_string(), Value::Int(30));
        let input = from_vec(vec![record(vec![("user", Value::Object(inner))])]);
        let rename = Rename::new(input, vec![(Path::parse("user.name"), "full_name".to_string())], false).unwrap();
        let out = rename.collect::<Result<Vec<_>>>().unwrap();
        let Value::Object(user) = &out[0]["user"] else { panic!("expected object") };
        assert_eq!(user.get("full_name"), Some(&Value::String("ann".to_string())));
        assert!(!user.contains_key("name"));
        assert_eq!(user.get("age"), Some(&Value::Int(30)));
        assert_eq!(user.keys().map(String::as_str).collect::<Vec<_>>(), vec!["full_name", "age"]);
    }

    #[test]
    fn dotted_source_missing_from_record_passes_through_when_lenient() {
        let input = from_vec(vec![record(vec![("a", Value::Int(1))])]);
        let rename = Rename::new(input, vec![(Path::parse("user.name"), "full_name".to_string())], false).unwrap();
        let out = rename.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(out[0].get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn unknown_source_is_pipeline_fatal_in_strict_mode() {
        let input = from_vec(vec![record(vec![("a", Value::Int(1))])]);
        let rename = Rename::new(input, vec![(Path::parse("b"), "x".to_string())], true).unwrap();
        let out: Result<Vec<_>> = rename.collect();
        assert!(out.is_err());
    }

    #[test]
    fn unknown_dotted_source_is_pipeline_fatal_in_strict_mode() {
        let input = from_vec(vec![record(vec![("a", Value::Int(1))])]);
        let rename = Rename::new(input, vec![(Path::parse("user.name"), "full_name".to_string())], true).unwrap();
        let out: Result<Vec<_>> = rename.collect();
        assert!(out.is_err());
    }
}
