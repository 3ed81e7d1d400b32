//! Crate-wide error hierarchy for comment-eval.
//!
//! - Single root `Error` for all fallible public functions.
//! - Input malformation (bad URLs, bad tagged blocks, non-numeric lines) is
//!   NOT an error here: those degrade to empty/absent fields.
//! - Classifier failures never surface as `Error`; the matcher turns them
//!   into a negative verdict.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type EvalResult<T> = Result<T, Error>;

/// Root error type for the comment-eval crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid evaluation/batch configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// LLM client construction failure (missing credentials, bad endpoint...).
    #[error(transparent)]
    Llm(#[from] ai_llm_service::AiLlmError),

    /// File system failure while reading comments/datasets or writing results.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure of datasets or results.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Dataset-level problems (missing input directory, reference file...).
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Inconsistent call arguments.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration errors, raised at construction time (fail fast).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line_distance_threshold must be a non-negative integer, got {0}")]
    NegativeLineThreshold(i64),

    #[error("unknown semantic matcher type: {0} (expected `llm` or `embedding`)")]
    UnknownMatcherType(String),

    #[error("invalid value in {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        reason: &'static str,
    },
}
