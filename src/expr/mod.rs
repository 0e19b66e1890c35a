//! Expression engine: the filter sub-language (default for
//! `select`) and the advanced JMESPath query sub-language (opt-in), plus
//! projection-expression parsing for `project`.

pub mod ast;
pub mod eval;
pub mod jmespath_query;
pub mod lexer;
pub mod parser;
pub mod projection;

pub use eval::{eval, EvalError, EvalValue};
pub use jmespath_query::JmespathQuery;
pub use parser::{parse, ParseError};
pub use projection::{parse_fields, ProjectionField};

/// A syntax or unknown-identifier error in a filter/projection/JMESPath
/// expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ExpressionError(pub String);

impl From<ParseError> for ExpressionError {
    fn from(e: ParseError) -> Self {
        Self(e.to_string())
    }
}

/// A compiled filter expression, parsed once and reused across records.
#[derive(Clone)]
pub struct FilterExpr {
    source: String,
    ast: ast::Expr,
}

impl FilterExpr {
    /// Compile a filter expression.
    pub fn compile(source: &str) -> Result<Self, ExpressionError> {
        let ast = parse(source)?;
        Ok(Self { source: source.to_string(), ast })
    }

    #[must_use]
    pub const fn source(&self) -> &str {
        self.source.as_str()
    }

    /// Evaluate the predicate against a record, returning its truthiness.
    pub fn matches(&self, record: &crate::value::Record) -> Result<bool, EvalError> {
        Ok(eval(&self.ast, record)?.is_truthy_value())
    }

    /// Evaluate for a general (non-boolean) value, used by projection.
    pub fn evaluate(&self, record: &crate::value::Record) -> Result<EvalValue, EvalError> {
        eval(&self.ast, record)
    }
}

impl EvalValue {
    #[must_use]
    pub fn is_truthy_value(&self) -> bool {
        match self {
            Self::Present(v) => v.is_truthy(),
            Self::Absent => false,
        }
    }
}
