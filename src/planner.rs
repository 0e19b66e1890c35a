//! Execution Planner: classifies each operator in a chain
//! as streamable, bounded-stateful, or materializing, and chooses an
//! execution mode. Emits warnings into a `Vec<Warning>` rather than
//! printing them directly, keeping the planner free of I/O — the CLI and REPL drivers
//! each decide how to surface them.

use std::path::Path;

use crate::error::{Error, Result};
use crate::pipeline::OperatorKind;

/// How an operator behaves with respect to buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Streaming,
    BoundedStateful,
    Materializing,
}

impl OperatorKind {
    #[must_use]
    pub const fn capability(self) -> Capability {
        match self {
            Self::Select
            | Self::Project
            | Self::Rename
            | Self::Explode
            | Self::Union
            | Self::Take
            | Self::Skip => Capability::Streaming,
            Self::Distinct | Self::GroupBy => Capability::BoundedStateful,
            Self::Join | Self::Intersection | Self::Difference | Self::Product | Self::Sort | Self::Aggregate => {
                Capability::Materializing
            }
        }
    }
}

/// The chosen execution strategy for a planned chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Stream,
    Materialize,
    Windowed { window: usize },
}

/// A non-fatal advisory emitted by the Planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    LargeInputForMemoryIntensiveOperator { operator: &'static str, estimated_bytes: u64 },
    StreamingRequestedForNonStreamable { operator: &'static str },
    WindowedApproximation { operator: &'static str },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LargeInputForMemoryIntensiveOperator { operator, estimated_bytes } => write!(
                f,
                "{operator} is memory-intensive and the estimated input is {estimated_bytes} bytes"
            ),
            Self::StreamingRequestedForNonStreamable { operator } => {
                write!(f, "streaming was requested but {operator} is not streamable; falling back to materialize")
            }
            Self::WindowedApproximation { operator } => {
                write!(f, "windowed execution of {operator} is an approximation, not a global result")
            }
        }
    }
}

/// Heuristic threshold above which a memory-intensive operator over a
/// file input triggers a warning.
const LARGE_INPUT_BYTES: u64 = 64 * 1024 * 1024;

/// Decide the execution mode for a chain of operators.
///
/// # Errors
/// Returns `Error::Usage` if a `--window` size is paired with `join`.
pub fn plan(
    operators: &[OperatorKind],
    requested_window: Option<usize>,
    requested_streaming: bool,
    input_path: Option<&Path>,
) -> Result<(ExecutionMode, Vec<Warning>)> {
    let mut warnings = Vec::new();
    let any_materializing = operators.iter().any(|op| op.capability() == Capability::Materializing);
    let any_bounded = operators.iter().any(|op| op.capability() == Capability::BoundedStateful);

    if let Some(window) = requested_window {
        if operators.iter().any(|op| matches!(op, OperatorKind::Join)) {
            return Err(Error::Usage("windowed execution is not supported for join".to_string()));
        }
        for op in operators {
            if op.capability() == Capability::Materializing {
                warnings.push(Warning::WindowedApproximation { operator: op.name() });
            }
        }
        return Ok((ExecutionMode::Windowed { window }, warnings));
    }

    if requested_streaming && (any_materializing || any_bounded) {
        for op in operators {
            if op.capability() != Capability::Streaming {
                warnings.push(Warning::StreamingRequestedForNonStreamable { operator: op.name() });
            }
        }
    }

    if let (Some(path), true) = (input_path, any_materializing) {
        if let Ok(metadata) = std::fs::metadata(path) {
            if metadata.len() > LARGE_INPUT_BYTES {
                if let Some(op) = operators.iter().find(|op| op.capability() == Capability::Materializing) {
                    warnings.push(Warning::LargeInputForMemoryIntensiveOperator {
                        operator: op.name(),
                        estimated_bytes: metadata.len(),
                    });
                }
            }
        }
    }

    let mode = if any_materializing || any_bounded {
        ExecutionMode::Materialize
    } else {
        ExecutionMode::Stream
    };
    Ok((mode, warnings))
}
