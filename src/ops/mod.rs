//! Operator Core: streaming, bounded-stateful, and
//! materializing relational operators, each a concrete `Iterator` adapter
//! over a boxed upstream relation.

pub mod difference;
pub mod distinct;
pub mod explode;
pub mod intersection;
pub mod join;
pub mod product;
pub mod project;
pub mod rename;
pub mod select;
pub mod sort;
pub mod take_skip;
pub mod union;

use crate::value::Record;

/// A relation: a lazy sequence of records, each fallible.
pub type Relation = Box<dyn Iterator<Item = crate::error::Result<Record>>>;

/// Structural pipeline failures: unknown
/// dataset name, rename collision, duplicate projection names,
/// group-metadata inconsistency.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("duplicate projection output name {0:?}")]
    DuplicateProjectionName(String),
    #[error("rename target {0:?} is used more than once")]
    RenameCollision(String),
    #[error("rename source {0:?} appears more than once")]
    DuplicateRenameSource(String),
    #[error("inconsistent group metadata: expected grouping keys {expected:?}, found {found:?}")]
    InconsistentGroupMetadata { expected: Vec<String>, found: Vec<String> },
    #[error("unknown field {0:?} in strict rename")]
    UnknownRenameTarget(String),
}

/// Wrap a plain iterator of records as an infallible `Relation`.
pub fn from_vec(records: Vec<Record>) -> Relation {
    Box::new(records.into_iter().map(Ok))
}

/// Materialize a relation into a `Vec`, short-circuiting on the first
/// error.
///
/// # Errors
/// Returns the first error encountered while draining the relation.
pub fn collect(relation: Relation) -> crate::error::Result<Vec<Record>> {
    relation.collect()
}
