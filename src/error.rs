//! Error types for jla.

use std::path::PathBuf;
use std::process::ExitCode;

/// Custom error type for jla operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No JSONL input found at the given location.
    #[error("No JSONL input found at {}", path.display())]
    NoInput { path: PathBuf },

    #[error("{0}")]
    Parse(#[from] crate::io::reader::ParseError),

    #[error("{0}")]
    Expression(#[from] crate::expr::ExpressionError),

    #[error("{0}")]
    Eval(#[from] crate::expr::EvalError),

    #[error("{0}")]
    Pipeline(#[from] crate::ops::PipelineError),

    #[error("unknown dataset {name:?}")]
    UnknownDataset { name: String },

    #[error("dataset name {name:?} is already in use")]
    DuplicateDataset { name: String },

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    #[error("usage error: {0}")]
    Usage(String),
}

impl Error {
    /// Map this error onto the process exit-code taxonomy.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) => ExitCode::from(2),
            Self::NoInput { .. } | Self::Io(_) => ExitCode::from(3),
            Self::Parse(_)
            | Self::Expression(_)
            | Self::Eval(_)
            | Self::Pipeline(_)
            | Self::UnknownDataset { .. }
            | Self::DuplicateDataset { .. }
            | Self::SchemaValidation(_)
            | Self::Json(_) => ExitCode::from(4),
            Self::Readline(_) => ExitCode::FAILURE,
        }
    }

    /// Render this error as a single-line JSON object, for the opt-in
    /// `--error-format json` error sink.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let obj = serde_json::json!({ "error": self.to_string() });
        obj.to_string()
    }
}

/// Result type alias for jla operations.
pub type Result<T> = std::result::Result<T, Error>;
