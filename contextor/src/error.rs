//! Typed errors for the contextor crate.
//!
//! - [`FormatError`]: corpus shape problems and window formatting failures
//! - [`BootstrapError`]: anything that prevents building a [`crate::ChatContext`]
//! - [`GenerationError`]: the reply generator failed (downgraded by the session)
//! - [`ChatError`]: failures that abort a chat cycle

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    /// Window expansion needs at least one record.
    #[error("document store is empty")]
    EmptyStore,

    /// A corpus row failed shape validation.
    #[error("{path}:{line}: {reason}")]
    Malformed {
        path: String,
        line: usize,
        reason: String,
    },

    /// Two records share the same sequence index.
    #[error("duplicate sequence index {0}")]
    DuplicateIndex(u64),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("corpus error: {0}")]
    Corpus(#[from] FormatError),

    /// No non-primary speaker among the sampled records.
    #[error("no persona found: every sampled message belongs to `{primary}`")]
    NoPersona { primary: String },

    /// More than one non-primary speaker among the sampled records.
    #[error("ambiguous persona: candidates {candidates:?}")]
    AmbiguousPersona { candidates: Vec<String> },

    /// Prompt template is unusable (missing placeholder, unreadable file).
    #[error("prompt template error: {0}")]
    Template(String),

    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("retriever setup failed: {0}")]
    Retriever(#[from] rag_store::RagError),

    #[error("LLM setup failed: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Upstream LLM call failed.
    #[error(transparent)]
    Llm(#[from] ai_llm_service::AiLlmError),

    #[error("model returned an empty response")]
    Empty,

    /// Failure reported by a non-LLM generator.
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] rag_store::RagError),

    #[error("context formatting failed: {0}")]
    Format(#[from] FormatError),
}
