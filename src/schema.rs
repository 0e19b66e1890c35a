//! Schema sub-engine: infer a JSON-Schema-shaped
//! description from a finite relation, and validate records against an
//! external schema via the `jsonschema` crate. No hand-rolled
//! validation — the implementation is exactly the external-validator
//! invocation and no more.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::value::{Record, Value};

/// The set of JSON types observed for one path across a sample of
/// records.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    pub types: BTreeSet<&'static str>,
    pub nullable: bool,
    pub required: bool,
    pub children: BTreeMap<String, FieldSchema>,
}

/// An inferred, advisory JSON-Schema-style description of a relation.
#[derive(Debug, Clone, Default)]
pub struct InferredSchema {
    pub fields: BTreeMap<String, FieldSchema>,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Int(_) | Value::Float(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn observe(fields: &mut BTreeMap<String, FieldSchema>, record: &Record) {
    for (key, value) in record {
        let entry = fields.entry(key.clone()).or_default();
        if value.is_null() {
            entry.nullable = true;
        } else {
            entry.types.insert(type_name(value));
        }
        match value {
            Value::Object(inner) => observe(&mut entry.children, inner),
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        observe(&mut entry.children, inner);
                    }
                }
            }
            _ => {}
        }
    }
}

fn finalize_required(fields: &mut BTreeMap<String, FieldSchema>, total: usize, presence: &BTreeMap<String, usize>) {
    for (key, field) in fields.iter_mut() {
        field.required = presence.get(key).copied().unwrap_or(0) == total;
    }
}

/// Infer a schema description from a finite relation: for
/// each observed path, the set of observed types, whether null was
/// ever observed, and whether the field is required (present, even if
/// null, in every record). Object-typed paths recurse; array-typed
/// paths union their element schemas.
#[must_use]
pub fn infer_schema(records: &[Record]) -> InferredSchema {
    let mut fields = BTreeMap::new();
    let mut presence: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        observe(&mut fields, record);
        for key in record.keys() {
            *presence.entry(key.clone()).or_insert(0) += 1;
        }
    }
    finalize_required(&mut fields, records.len(), &presence);
    finalize_nested_required(&mut fields, records);
    InferredSchema { fields }
}

fn finalize_nested_required(fields: &mut BTreeMap<String, FieldSchema>, records: &[Record]) {
    for (key, field) in fields.iter_mut() {
        let nested_records: Vec<Record> = records
            .iter()
            .filter_map(|r| match r.get(key) {
                Some(Value::Object(inner)) => Some(inner.clone()),
                _ => None,
            })
            .collect();
        if !nested_records.is_empty() {
            let nested = infer_schema(&nested_records);
            field.children = nested.fields;
        }
    }
}

/// Compile a JSON-Schema document and validate each record against it.
///
/// # Errors
/// Returns `Error::SchemaValidation` if the schema fails to compile or
/// any record fails validation; the message names the first failing
/// record's index.
pub fn validate(schema: &serde_json::Value, records: &[Record]) -> Result<()> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| Error::SchemaValidation(e.to_string()))?;

    for (index, record) in records.iter().enumerate() {
        let json: serde_json::Value = Value::Object(record.clone()).into();
        if let Err(e) = validator.validate(&json) {
            return Err(Error::SchemaValidation(format!("record {index}: {e}")));
        }
    }
    Ok(())
}
