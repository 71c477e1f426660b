//! Reply generation contract and the LLM-backed implementation.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::{HealthStatus, LlmServiceProfiles};
use tracing::{debug, instrument};

use crate::error::GenerationError;

/// Everything a generator gets for one reply.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    /// Fully rendered persona prompt.
    pub prompt: String,
    /// Context blocks that were substituted into the prompt.
    pub context: Vec<String>,
    pub question: String,
}

pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;

pub type HealthFuture<'a> = Pin<Box<dyn Future<Output = Vec<HealthStatus>> + Send + 'a>>;

/// Produces the persona's reply.
pub trait ResponseGenerator: Send + Sync {
    fn generate<'a>(&'a self, req: &'a GenerationRequest) -> GenerationFuture<'a>;

    /// Upstream probes; empty when the generator has nothing to check.
    fn health(&self) -> HealthFuture<'_> {
        Box::pin(async { Vec::new() })
    }
}

/// [`ResponseGenerator`] over the shared LLM chat profile.
///
/// The rendered prompt is sent as the user message with no system message,
/// the persona instructions live in the prompt itself.
pub struct LlmGenerator {
    svc: Arc<LlmServiceProfiles>,
}

impl LlmGenerator {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }

    #[instrument(skip_all, fields(prompt_len = req.prompt.len(), blocks = req.context.len()))]
    async fn run(&self, req: &GenerationRequest) -> Result<String, GenerationError> {
        let out = self.svc.generate_chat(&req.prompt, None).await?;
        let out = out.trim();
        if out.is_empty() {
            return Err(GenerationError::Empty);
        }
        debug!(reply_len = out.len(), "reply generated");
        Ok(out.to_string())
    }
}

impl ResponseGenerator for LlmGenerator {
    fn generate<'a>(&'a self, req: &'a GenerationRequest) -> GenerationFuture<'a> {
        Box::pin(self.run(req))
    }

    fn health(&self) -> HealthFuture<'_> {
        Box::pin(self.svc.health_all())
    }
}
