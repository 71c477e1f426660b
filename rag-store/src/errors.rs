//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Qdrant client errors (wrapped).
    #[error("qdrant error: {0}")]
    Qdrant(String),

    /// Embedding provider failed to produce a vector.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Embedding dimensionality differs from the configured one.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Point payload carries no usable integer `idx`.
    #[error("payload has no integer `idx` (score {score})")]
    MissingIndex { score: f32 },

    /// Point payload is malformed (e.g. missing `text`).
    #[error("parse error: {0}")]
    Parse(String),
}
