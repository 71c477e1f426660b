use crate::errors::RagError;
use std::{future::Future, pin::Pin};

/// Asynchronous embedding provider.
///
/// Implement this trait to plug in an embedding backend (the LLM service
/// profiles in production, fixed vectors in tests).
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;
}

pub mod llm_embedder;
