//! Embedding provider backed by the shared LLM service profiles.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::LlmServiceProfiles;
use tracing::warn;

use crate::{EmbeddingsProvider, RagError};

/// Embeds through `LlmServiceProfiles::embed` (Ollama, OpenAI or Azure OpenAI).
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    /// Expected dimension; `None` accepts whatever the model returns.
    dim: Option<usize>,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let v = self
                .svc
                .embed(text)
                .await
                .map_err(|e| RagError::Embedding(e.to_string()))?;
            check_dim(v, self.dim)
        })
    }
}

fn check_dim(v: Vec<f32>, want: Option<usize>) -> Result<Vec<f32>, RagError> {
    if v.is_empty() {
        return Err(RagError::Embedding("provider returned an empty vector".into()));
    }
    match want {
        Some(want) if v.len() != want => {
            warn!(got = v.len(), want, "embedding dimension mismatch");
            Err(RagError::VectorSizeMismatch {
                got: v.len(),
                want,
            })
        }
        _ => Ok(v),
    }
}
