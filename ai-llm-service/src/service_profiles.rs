//! Shared LLM service with two active profiles: `chat` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmModelConfig, LlmProvider, LlmServiceProfiles};
//!
//! # async fn run() -> Result<(), ai_llm_service::AiLlmError> {
//! let chat = LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "llama3.1:8b".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     deployment: None,
//!     api_version: None,
//!     max_tokens: Some(512),
//!     temperature: Some(0.7),
//!     top_p: Some(0.9),
//!     timeout_secs: Some(60),
//! };
//! let embedding = LlmModelConfig { model: "nomic-embed-text".into(), ..chat.clone() };
//!
//! let svc = Arc::new(LlmServiceProfiles::new(chat, embedding, Some(10))?);
//! let reply = svc.generate_chat("Hello there", None).await?;
//! let vector = svc.embed("Hello there").await?;
//! println!("{reply} / dim={}", vector.len());
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Shared service over the **chat** and **embedding** profiles.
///
/// Clients are created lazily on first use and cached by [`ClientKey`].
pub struct LlmServiceProfiles {
    chat: LlmModelConfig,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates the service.
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the health client cannot be built.
    pub fn new(
        chat: LlmModelConfig,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        Ok(Self {
            chat,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Generates a reply with the **chat** profile.
    ///
    /// `system` is sent as a system message (OpenAI/Azure) or the `system`
    /// field (Ollama).
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if the client cannot be created or the call fails.
    pub async fn generate_chat(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        match self.chat.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(&self.chat).await?;
                cli.generate(prompt, system).await
            }
            LlmProvider::OpenAI | LlmProvider::AzureOpenAI => {
                let cli = self.get_or_init_openai(&self.chat).await?;
                cli.generate(prompt, system).await
            }
        }
    }

    /// Computes an embedding with the **embedding** profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if the client cannot be created or the call fails.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match self.embedding.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(&self.embedding).await?;
                cli.embeddings(input).await
            }
            LlmProvider::OpenAI | LlmProvider::AzureOpenAI => {
                let cli = self.get_or_init_openai(&self.embedding).await?;
                cli.embeddings(input).await
            }
        }
    }

    /// Health snapshot for the distinct profiles (identical profiles are probed once).
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = Vec::with_capacity(2);
        list.push(self.chat.clone());
        if self.embedding != self.chat {
            list.push(self.embedding.clone());
        }
        self.health.check_many(&list).await
    }

    /// Returns references to the current profiles `(chat, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.chat, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        debug!(model = %cfg.model, "cached new Ollama client");
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        debug!(provider = ?cfg.provider, model = %cfg.model, "cached new OpenAI-compatible client");
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Internal cache key identifying unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    deployment: Option<String>,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            deployment: cfg.deployment.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama(model: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            deployment: None,
            api_version: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[tokio::test]
    async fn clients_are_cached_per_config() {
        let svc = LlmServiceProfiles::new(ollama("chat"), ollama("embed"), Some(1)).unwrap();
        let a = svc.get_or_init_ollama(&ollama("chat")).await.unwrap();
        let b = svc.get_or_init_ollama(&ollama("chat")).await.unwrap();
        let c = svc.get_or_init_ollama(&ollama("embed")).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(svc.ollama.read().await.len(), 2);
    }

    #[tokio::test]
    async fn client_init_errors_propagate() {
        let mut bad = ollama("chat");
        bad.provider = LlmProvider::OpenAI;
        let svc = LlmServiceProfiles::new(bad, ollama("embed"), Some(1)).unwrap();
        let err = svc.generate_chat("hi", None).await.unwrap_err();
        assert!(err.to_string().contains("missing API key"));
    }
}
