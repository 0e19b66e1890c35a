//! Grouping Engine: `group_by` annotates records with
//! reserved `_group*` metadata without collapsing them; `aggregate`
//! (in `group::aggregate`) consumes that metadata and emits one record
//! per innermost group.

pub mod aggregate;

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ops::Relation;
use crate::path::{get_path_in_record, Path};
use crate::value::{canonical_key, CanonicalKey, Record, Value};

/// `group_by(keys)`: requires one pass to bucket the
/// input by the tuple of key values, then one pass to emit records in
/// first-seen bucket order, each annotated with `_groups`,
/// `_group_size`, `_group_index`. Records within a bucket retain their
/// input order.
pub struct GroupBy {
    keys: Vec<Path>,
}

impl GroupBy {
    #[must_use]
    pub const fn new(keys: Vec<Path>) -> Self {
        Self { keys }
    }

    fn bucket_key(&self, record: &Record) -> Vec<CanonicalKey> {
        self.keys
            .iter()
            .map(|k| match get_path_in_record(record, k) {
                crate::path::Resolved::Value(v) => canonical_key(v),
                crate::path::Resolved::Absent => canonical_key(&Value::Null),
            })
            .collect()
    }

    fn key_values(&self, record: &Record) -> Vec<Value> {
        self.keys
            .iter()
            .map(|k| {
                get_path_in_record(record, k)
                    .value()
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect()
    }

    /// Apply grouping, materializing the input into ordered buckets.
    ///
    /// # Errors
    /// Returns the first error encountered while draining `input`.
    pub fn apply(&self, input: Relation) -> Result<Relation> {
        let mut bucket_order: Vec<Vec<CanonicalKey>> = Vec::new();
        let mut buckets: HashMap<Vec<CanonicalKey>, Vec<Record>> = HashMap::new();
        let mut key_values_by_bucket: HashMap<Vec<CanonicalKey>, Vec<Value>> = HashMap::new();

        for record in input {
            let record = record?;
            let key = self.bucket_key(&record);
            if !buckets.contains_key(&key) {
                bucket_order.push(key.clone());
                key_values_by_bucket.insert(key.clone(), self.key_values(&record));
            }
            buckets.entry(key).or_default().push(record);
        }

        let mut out = Vec::new();
        for key in bucket_order {
            let values = key_values_by_bucket.remove(&key).unwrap_or_default();
            let members = buckets.remove(&key).unwrap_or_default();
            let size = members.len();
            for (index, mut record) in members.into_iter().enumerate() {
                append_group_entry(&mut record, &self.keys, &values, size, index)?;
                out.push(record);
            }
        }
        Ok(Box::new(out.into_iter().map(Ok)))
    }
}

fn append_group_entry(
    record: &mut Record,
    keys: &[Path],
    values: &[Value],
    size: usize,
    index: usize,
) -> Result<()> {
    let mut groups: Vec<Value> = match record.get("_groups") {
        Some(Value::Array(existing)) => existing.clone(),
        Some(_) | None => Vec::new(),
    };
    for (path, value) in keys.iter().zip(values.iter()) {
        let mut entry = Record::new();
        entry.insert("field".to_string(), Value::String(path.as_dotted()));
        entry.insert("value".to_string(), value.clone());
        groups.push(Value::Object(entry));
    }
    record.insert("_groups".to_string(), Value::Array(groups));
    record.insert("_group_size".to_string(), Value::Int(size as i64));
    record.insert("_group_index".to_string(), Value::Int(index as i64));
    Ok(())
}

/// Read back the `_groups` field sequence of a record, in declaration
/// order, for consistency checking.
#[must_use]
pub fn group_field_sequence(record: &Record) -> Vec<String> {
    match record.get("_groups") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|e| e.as_object())
            .filter_map(|o| o.get("field"))
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Validate that every record in `records` carries the same `_groups`
/// field sequence. Empty input is trivially consistent.
///
/// # Errors
/// Returns `PipelineError::InconsistentGroupMetadata` (wrapped) if any
/// two records disagree.
pub fn assert_consistent_group_metadata(records: &[Record]) -> Result<Vec<String>> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let expected = group_field_sequence(first);
    for record in &records[1..] {
        let found = group_field_sequence(record);
        if found != expected {
            return Err(Error::Pipeline(crate::ops::PipelineError::InconsistentGroupMetadata {
                expected,
                found,
            }));
        }
    }
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{collect, from_vec};
    use indexmap::IndexMap;

    fn record(region: &str, amount: i64) -> Record {
        let mut m = IndexMap::new();
        m.insert("region".to_string(), Value::String(region.to_string()));
        m.insert("amount".to_string(), Value::Int(amount));
        m
    }

    #[test]
    fn annotates_group_metadata_preserving_input_order() {
        let input = from_vec(vec![record("N", 1), record("S", 2), record("N", 3)]);
        let grouped = GroupBy::new(vec![Path::parse("region")]).apply(input).unwrap();
        let out = collect(grouped).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0]["_group_size"], Value::Int(2));
        assert_eq!(out[0]["_group_index"], Value::Int(0));
        assert_eq!(out[2]["_group_index"], Value::Int(1));
    }

    #[test]
    fn chained_group_by_appends_to_groups() {
        let input = from_vec(vec![record("N", 1)]);
        let first = GroupBy::new(vec![Path::parse("region")]).apply(input).unwrap();
        let second = GroupBy::new(vec![Path::parse("amount")]).apply(first).unwrap();
        let out = collect(second).unwrap();
        let groups = match &out[0]["_groups"] {
            Value::Array(items) => items,
            _ => unreachable!(),
        };
        assert_eq!(groups.len(), 2);
    }
}
