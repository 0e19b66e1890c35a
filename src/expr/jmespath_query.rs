//! The advanced query sub-language: JMESPath, opt-in via
//! `--jmespath`. A record passes `select --jmespath EXPR` iff the
//! expression yields a truthy value.
//!
//! This is a thin wrapper over the `jmespath` crate — the engine does not
//! implement a second expression language by hand, the same way schema
//! validation delegates to an external validator rather than a
//! hand-rolled one.

use jmespath::Expression;

use super::ExpressionError;
use crate::value::{Record, Value};

/// A compiled JMESPath expression, cached like the filter sub-language's
/// AST.
pub struct JmespathQuery {
    compiled: Expression<'static>,
}

impl JmespathQuery {
    /// Compile a JMESPath expression once.
    pub fn compile(source: &str) -> Result<Self, ExpressionError> {
        let compiled = jmespath::compile(source).map_err(|e| ExpressionError(e.to_string()))?;
        Ok(Self { compiled })
    }

    /// Evaluate the expression against a record; truthy per JMESPath's own
    /// truthiness rules (empty string/array/object, `false`, and `null`
    /// are falsy).
    pub fn is_truthy(&self, record: &Record) -> Result<bool, ExpressionError> {
        let json: serde_json::Value = Value::Object(record.clone()).into();
        let text = json.to_string();
        let variable = jmespath::Variable::from_json(&text).map_err(|e| ExpressionError(e.to_string()))?;
        let result = self
            .compiled
            .search(variable)
            .map_err(|e| ExpressionError(e.to_string()))?;
        Ok(result.is_truthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn filters_by_nested_field() {
        let mut record: Record = IndexMap::new();
        let mut user = IndexMap::new();
        user.insert("age".to_string(), Value::Int(30));
        record.insert("user".to_string(), Value::Object(user));

        let q = JmespathQuery::compile("user.age > `18`").unwrap();
        assert!(q.is_truthy(&record).unwrap());
    }

    #[test]
    fn rejects_invalid_syntax() {
        assert!(JmespathQuery::compile("user..[[[").is_err());
    }
}
