use std::sync::Arc;

use ai_llm_service::{LlmServiceProfiles, profiles_from_env};
use contextor::{ChatContext, ContextorConfig, build_chat_context};
use tracing::info;

use crate::error_handler::AppError;

/// Timeout for upstream health probes, seconds.
const HEALTH_TIMEOUT_SECS: u64 = 10;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Immutable chat pipeline context.
    pub chat: ChatContext,
    /// Corpus identifier reported by `/get_user`.
    pub corpus_id: String,
}

impl AppState {
    /// Load configuration from the environment and build the chat context.
    ///
    /// # Errors
    /// Any configuration, corpus or persona problem; all are fatal at startup.
    pub fn from_env() -> Result<Self, AppError> {
        let (chat_cfg, embedding_cfg) = profiles_from_env()?;
        let svc = Arc::new(LlmServiceProfiles::new(
            chat_cfg,
            embedding_cfg,
            Some(HEALTH_TIMEOUT_SECS),
        )?);

        let cfg = ContextorConfig::from_env()?;
        let chat = build_chat_context(&cfg, svc)?;

        info!(corpus_id = %cfg.corpus_id, "application state ready");
        Ok(Self {
            chat,
            corpus_id: cfg.corpus_id,
        })
    }
}
