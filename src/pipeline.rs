//! Pipeline Composer: a typed, composable operator chain.
//! `A then B` is realized as a builder (`Pipeline::then`), since Rust
//! has no bare infix operator overloading for arbitrary names;
//! `std::ops::Shr` is additionally implemented so callers who want the
//! literal `p >> select(..) >> project(..)` syntax can use it instead.
//! Both push onto the same underlying `Vec<Operator>`.

use std::ops::Shr;

use crate::error::Result;
use crate::expr::{FilterExpr, JmespathQuery, ProjectionField};
use crate::group::aggregate::AggSpec;
use crate::ops::join::JoinMode;
use crate::ops::project::{AbsentPolicy, OutputShape};
use crate::ops::select::{EvalPolicy, Predicate};
use crate::ops::Relation;
use crate::path::Path;

/// The capability-classification tag used by the Planner;
/// kept separate from `Operator` so the Planner can reason about a
/// chain's shape without holding the operators' actual parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Select,
    Project,
    Rename,
    Explode,
    Union,
    Take,
    Skip,
    Distinct,
    GroupBy,
    Join,
    Intersection,
    Difference,
    Product,
    Sort,
    Aggregate,
}

impl OperatorKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Project => "project",
            Self::Rename => "rename",
            Self::Explode => "explode",
            Self::Union => "union",
            Self::Take => "take",
            Self::Skip => "skip",
            Self::Distinct => "distinct",
            Self::GroupBy => "group_by",
            Self::Join => "join",
            Self::Intersection => "intersection",
            Self::Difference => "difference",
            Self::Product => "product",
            Self::Sort => "sort",
            Self::Aggregate => "aggregate",
        }
    }
}

/// A single step of a pipeline: an operator together with the
/// parameters needed to construct it against an upstream relation.
/// Binary operators (`union`, `join`, ...) carry their other side as an
/// already-opened `Relation` — the workspace layer resolves a dataset
/// name to a relation before building the step; `Pipeline` itself is
/// agnostic to where that relation came from.
pub enum Operator {
    Select { predicate: Predicate, policy: EvalPolicy },
    Project { fields: Vec<ProjectionField>, absent: AbsentPolicy, shape: OutputShape },
    Rename { mapping: Vec<(Path, String)>, strict: bool },
    Explode { path: Path },
    Union { rhs: Relation },
    Take { n: usize },
    Skip { n: usize },
    Distinct,
    GroupBy { keys: Vec<Path> },
    Aggregate { specs: Vec<AggSpec> },
    Join { rhs: Relation, on: Vec<(Path, Path)>, mode: JoinMode },
    Intersection { rhs: Relation },
    Difference { rhs: Relation },
    Product { rhs: Relation },
    Sort { keys: Vec<Path>, desc: bool },
}

impl Operator {
    #[must_use]
    pub const fn kind(&self) -> OperatorKind {
        match self {
            Self::Select { .. } => OperatorKind::Select,
            Self::Project { .. } => OperatorKind::Project,
            Self::Rename { .. } => OperatorKind::Rename,
            Self::Explode { .. } => OperatorKind::Explode,
            Self::Union { .. } => OperatorKind::Union,
            Self::Take { .. } => OperatorKind::Take,
            Self::Skip { .. } => OperatorKind::Skip,
            Self::Distinct => OperatorKind::Distinct,
            Self::GroupBy { .. } => OperatorKind::GroupBy,
            Self::Aggregate { .. } => OperatorKind::Aggregate,
            Self::Join { .. } => OperatorKind::Join,
            Self::Intersection { .. } => OperatorKind::Intersection,
            Self::Difference { .. } => OperatorKind::Difference,
            Self::Product { .. } => OperatorKind::Product,
            Self::Sort { .. } => OperatorKind::Sort,
        }
    }
}

/// A builder-style chain of operators, applied in declaration order
/// against a source relation.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Operator>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    #[must_use]
    pub fn then(mut self, op: Operator) -> Self {
        self.steps.push(op);
        self
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<OperatorKind> {
        self.steps.iter().map(Operator::kind).collect()
    }

    /// Apply every step against `input` in order, returning the final
    /// relation. Group metadata (`_groups`) is threaded through
    /// `GroupBy`/`Aggregate` steps exactly as `group_by | aggregate`
    /// would be invoked standalone: `Aggregate` always
    /// consumes the immediately preceding materialized state.
    ///
    /// # Errors
    /// Returns the first error raised while constructing any step
    /// (e.g. a `PipelineError` from `rename`/`project` validation, or
    /// an I/O error materializing a binary operator's other side).
    pub fn run(self, input: Relation) -> Result<Relation> {
        let mut current = input;
        let registry = crate::group::aggregate::AggregateRegistry::with_builtins();
        for step in self.steps {
            current = apply_step(step, current, &registry)?;
        }
        Ok(current)
    }
}

fn apply_step(
    step: Operator,
    current: Relation,
    registry: &crate::group::aggregate::AggregateRegistry,
) -> Result<Relation> {
    use crate::ops::{difference, distinct, explode, intersection, join, product, rename, select, sort, union};

    Ok(match step {
        Operator::Select { predicate, policy } => Box::new(select::Select::new(current, predicate, policy)),
        Operator::Project { fields, absent, shape } => {
            Box::new(crate::ops::project::Project::new(current, fields, absent, shape)?)
        }
        Operator::Rename { mapping, strict } => Box::new(rename::Rename::new(current, mapping, strict)?),
        Operator::Explode { path } => Box::new(explode::Explode::new(current, path)),
        Operator::Union { rhs } => Box::new(union::Union::new(current, rhs)),
        Operator::Take { n } => Box::new(crate::ops::take_skip::Take::new(current, n)),
        Operator::Skip { n } => Box::new(crate::ops::take_skip::Skip::new(current, n)),
        Operator::Distinct => Box::new(distinct::Distinct::new(current)),
        Operator::GroupBy { keys } => crate::group::GroupBy::new(keys).apply(current)?,
        Operator::Aggregate { specs } => {
            let records = crate::ops::collect(current)?;
            let aggregated = crate::group::aggregate::aggregate(records, &specs, registry)?;
            crate::ops::from_vec(aggregated)
        }
        Operator::Join { rhs, on, mode } => Box::new(join::Join::new(current, rhs, on, mode)?),
        Operator::Intersection { rhs } => Box::new(intersection::Intersection::new(current, rhs)?),
        Operator::Difference { rhs } => Box::new(difference::Difference::new(current, rhs)?),
        Operator::Product { rhs } => Box::new(product::Product::new(current, rhs)?),
        Operator::Sort { keys, desc } => sort::sort_relation(current, keys, desc),
    })
}

impl Shr<Operator> for Pipeline {
    type Output = Self;

    fn shr(self, op: Operator) -> Self::Output {
        self.then(op)
    }
}

/// Convenience constructors mirroring the abstract CLI surface (spec
/// §6), used by both `main.rs` and `repl.rs` to build an `Operator`
/// from parsed arguments without duplicating the parameter shuffling.
impl Operator {
    #[must_use]
    pub fn select_filter(source: &FilterExpr, policy: EvalPolicy) -> Self {
        Self::Select { predicate: Predicate::Filter(source.clone()), policy }
    }

    #[must_use]
    pub fn select_jmespath(query: JmespathQuery, policy: EvalPolicy) -> Self {
        Self::Select { predicate: Predicate::Jmespath(query), policy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{collect, from_vec};
    use crate::value::{Record, Value};
    use indexmap::IndexMap;

    fn record(a: i64) -> Record {
        let mut m = IndexMap::new();
        m.insert("a".to_string(), Value::Int(a));
        m
    }

    #[test]
    fn then_builds_chain_in_order() {
        let input = from_vec(vec![record(1), record(2), record(3)]);
        let filter = FilterExpr::compile("a > 1").unwrap();
        let pipeline = Pipeline::new()
            .then(Operator::select_filter(&filter, EvalPolicy::Strict))
            .then(Operator::Take { n: 1 });
        let out = collect(pipeline.run(input).unwrap()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["a"], Value::Int(2));
    }

    #[test]
    fn shr_operator_composes_identically_to_then() {
        let input = from_vec(vec![record(1), record(2)]);
        let filter = FilterExpr::compile("a > 0").unwrap();
        let pipeline = Pipeline::new() >> Operator::select_filter(&filter, EvalPolicy::Strict) >> Operator::Take { n: 1 };
        let out = collect(pipeline.run(input).unwrap()).unwrap();
        assert_eq!(out.len(), 1);
    }
}
