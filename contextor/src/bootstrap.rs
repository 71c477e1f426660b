//! Startup wiring: corpus, persona, prompt, retriever, generator.

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use rag_store::{LlmEmbedder, QdrantRetriever};
use tracing::info;

use crate::cfg::ContextorConfig;
use crate::context::ChatContext;
use crate::corpus::DocumentStore;
use crate::error::BootstrapError;
use crate::generator::LlmGenerator;
use crate::persona::resolve_persona;
use crate::prompt::PersonaPrompt;

/// Builds the production [`ChatContext`]. Any failure is fatal for startup.
pub fn build_chat_context(
    cfg: &ContextorConfig,
    svc: Arc<LlmServiceProfiles>,
) -> Result<ChatContext, BootstrapError> {
    let store = DocumentStore::load_jsonl(&cfg.corpus_path)?;
    let persona = resolve_persona(&store, &cfg.primary_speaker, cfg.persona_sample_size)?;

    let prompt = match &cfg.prompt_template_path {
        Some(path) => PersonaPrompt::from_file(path)?,
        None => PersonaPrompt::default(),
    };

    let embedder = Arc::new(LlmEmbedder::new(svc.clone(), cfg.rag.embedding_dim));
    let retriever = QdrantRetriever::new(cfg.rag.clone(), embedder)?;
    let generator = LlmGenerator::new(svc);

    info!(
        corpus_id = %cfg.corpus_id,
        records = store.len(),
        bot_name = %persona.bot_name,
        collection = %cfg.rag.collection,
        half_width = cfg.window.half_width(),
        "chat context ready"
    );

    Ok(ChatContext::new(
        Arc::new(store),
        Arc::new(retriever),
        Arc::new(generator),
        persona,
        prompt,
        cfg.window,
    ))
}
