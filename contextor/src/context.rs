//! Immutable per-process context shared by every chat cycle.

use std::sync::Arc;

use rag_store::VectorRetriever;

use crate::corpus::DocumentStore;
use crate::generator::ResponseGenerator;
use crate::persona::Persona;
use crate::prompt::PersonaPrompt;
use crate::window::WindowConfig;

/// Built once at startup; cloning is cheap (all `Arc`s).
#[derive(Clone)]
pub struct ChatContext {
    pub store: Arc<DocumentStore>,
    pub retriever: Arc<dyn VectorRetriever>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub persona: Arc<Persona>,
    pub prompt: Arc<PersonaPrompt>,
    pub window: WindowConfig,
}

impl ChatContext {
    pub fn new(
        store: Arc<DocumentStore>,
        retriever: Arc<dyn VectorRetriever>,
        generator: Arc<dyn ResponseGenerator>,
        persona: Persona,
        prompt: PersonaPrompt,
        window: WindowConfig,
    ) -> Self {
        Self {
            store,
            retriever,
            generator,
            persona: Arc::new(persona),
            prompt: Arc::new(prompt),
            window,
        }
    }
}
