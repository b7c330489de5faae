//! Error types for seqweave.

use thiserror::Error;

use crate::common::CancellationError;

/// Errors that can occur while building or running an encoder-decoder model.
#[derive(Debug, Error)]
pub enum Seq2SeqError {
    /// Invalid or inconsistent configuration (feature/dims counts, rates, references).
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A requested feature exists in the data model but is not supported on this path.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A tensor disagrees with the batch/step invariants of the context.
    #[error("Shape mismatch for '{field}': expected {expected}, got {actual}")]
    ShapeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// A required input field was not provided.
    #[error("Missing required input '{0}'")]
    MissingInput(&'static str),

    /// Registry lookup failed.
    #[error("Unknown {kind} '{name}'. Available: {available}")]
    UnknownComponent {
        kind: &'static str,
        name: String,
        available: String,
    },

    /// The search was cancelled through its cancellation token.
    #[error("Generation cancelled")]
    Cancelled,

    /// An encoder or decoder implementation failed.
    #[error("Component failed: {0}")]
    Component(#[from] anyhow::Error),
}

impl Seq2SeqError {
    /// Builds a `ShapeMismatch` from two shapes.
    pub fn shape_mismatch(field: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        Seq2SeqError::ShapeMismatch {
            field: field.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

impl From<CancellationError> for Seq2SeqError {
    fn from(_: CancellationError) -> Self {
        Seq2SeqError::Cancelled
    }
}

/// Result type for seqweave operations.
pub type Seq2SeqResult<T> = Result<T, Seq2SeqError>;
