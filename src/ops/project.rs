//! `project(fields)`: emits, for each input record, a new
//! record containing exactly the specified output keys. Missing paths
//! become absent, which serialize to omitted keys by default (opt-in:
//! serialize as `null`). Streaming, O(1) memory.

use std::collections::HashSet;

use super::{PipelineError, Relation};
use crate::error::Result;
use crate::expr::{EvalValue, ProjectionField};
use crate::path::set_path_nested;
use crate::value::{Record, Value};

/// How a missing (absent) projected field is represented in the output
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbsentPolicy {
    #[default]
    Omit,
    Null,
}

/// Whether dotted-path output keys nest into structured output or stay
/// flat dotted-string keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputShape {
    #[default]
    Flat,
    Nested,
}

pub struct Project {
    input: Relation,
    fields: Vec<ProjectionField>,
    absent: AbsentPolicy,
    shape: OutputShape,
}

impl Project {
    /// # Errors
    /// Returns `PipelineError::DuplicateProjectionName` if two fields
    /// share an output key.
    pub fn new(
        input: Relation,
        fields: Vec<ProjectionField>,
        absent: AbsentPolicy,
        shape: OutputShape,
    ) -> std::result::Result<Self, PipelineError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.output_key.clone()) {
                return Err(PipelineError::DuplicateProjectionName(field.output_key.clone()));
            }
        }
        Ok(Self { input, fields, absent, shape })
    }

    fn project_one(&self, record: &Record) -> Result<Record> {
        let mut out = Record::new();
        for field in &self.fields {
            let value = crate::expr::eval(&field.expr, record)?;
            match value {
                EvalValue::Present(v) => set_output(&mut out, &field.output_key, v, self.shape),
                EvalValue::Absent => match self.absent {
                    AbsentPolicy::Omit => {}
                    AbsentPolicy::Null => set_output(&mut out, &field.output_key, Value::Null, self.shape),
                },
            }
        }
        Ok(out)
    }
}

fn set_output(out: &mut Record, key: &str, value: Value, shape: OutputShape) {
    match shape {
        OutputShape::Flat => {
            out.insert(key.to_string(), value);
        }
        OutputShape::Nested => {
            set_path_nested(out, &crate::path::Path::parse(key), value);
        }
    }
}

impl Iterator for Project {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.input.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };
        Some(self.project_one(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_fields;
    use crate::ops::from_vec;
    use indexmap::IndexMap;

    fn record(pairs: Vec<(&str, Value)>) -> Record {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<IndexMap<_, _>>()
    }

    #[test]
    fn missing_path_is_omitted_by_default() {
        let input = from_vec(vec![record(vec![("a", Value::Int(1))])]);
        let fields = parse_fields("a,b").unwrap();
        let project = Project::new(input, fields, AbsentPolicy::Omit, OutputShape::Flat).unwrap();
        let out = project.collect::<Result<Vec<_>>>().unwrap();
        assert!(!out[0].contains_key("b"));
    }

    #[test]
    fn missing_path_serializes_null_when_opted_in() {
        let input = from_vec(vec![record(vec![("a", Value::Int(1))])]);
        let fields = parse_fields("a,b").unwrap();
        let project = Project::new(input, fields, AbsentPolicy::Null, OutputShape::Flat).unwrap();
        let out = project.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(out[0].get("b"), Some(&Value::Null));
    }

    #[test]
    fn duplicate_output_name_is_pipeline_error() {
        let fields = vec![
            crate::expr::parser::parse("a").map(|e| ProjectionField { output_key: "x".into(), expr: e }).unwrap(),
            crate::expr::parser::parse("b").map(|e| ProjectionField { output_key: "x".into(), expr: e }).unwrap(),
        ];
        let input = from_vec(vec![]);
        assert!(Project::new(input, fields, AbsentPolicy::Omit, OutputShape::Flat).is_err());
    }

    #[test]
    fn projection_chain_is_idempotent_when_f2_subset_of_f1() {
        // project(project(R, F1), F2) == project(R, F2) when F2 ⊆ F1
        let input = from_vec(vec![record(vec![("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))])]);
        let f1 = parse_fields("a,b,c").unwrap();
        let step1 = Project::new(input, f1, AbsentPolicy::Omit, OutputShape::Flat).unwrap();
        let intermediate = step1.collect::<Result<Vec<_>>>().unwrap();

        let f2 = parse_fields("a,b").unwrap();
        let step2 = Project::new(from_vec(intermediate), f2, AbsentPolicy::Omit, OutputShape::Flat).unwrap();
        let chained = step2.collect::<Result<Vec<_>>>().unwrap();

        let direct_input = from_vec(vec![record(vec![("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))])]);
        let f2_direct = parse_fields("a,b").unwrap();
        let direct = Project::new(direct_input, f2_direct, AbsentPolicy::Omit, OutputShape::Flat)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(chained, direct);
    }
}
