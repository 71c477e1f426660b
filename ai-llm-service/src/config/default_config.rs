//! Default LLM configs loaded strictly from environment variables.
//!
//! Two roles are resolved for every provider:
//!
//! - **Chat**      → persona reply generation
//! - **Embedding** → query embeddings for vector retrieval
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`        = provider kind (`ollama`, `openai`, `azure`; default `ollama`)
//! - `LLM_MAX_TOKENS`  = optional max tokens (u32)
//! - `LLM_TEMPERATURE` = optional sampling temperature (0.0..=2.0)
//! - `LLM_TIMEOUT_SECS` = optional request timeout for chat calls
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = chat model (mandatory)
//! - `EMBEDDING_MODEL`             = embedding model (mandatory)
//!
//! OpenAI:
//! - `OPENAI_API_KEY` (mandatory), `OPENAI_URL` (default `https://api.openai.com`)
//! - `OPENAI_MODEL` (mandatory), `OPENAI_EMBEDDING_MODEL` (default `text-embedding-3-small`)
//!
//! Azure OpenAI:
//! - `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_VERSION` (mandatory)
//! - `AZURE_OPENAI_CHAT_DEPLOYMENT`, `AZURE_OPENAI_EMBEDDING_DEPLOYMENT` (mandatory)

use tracing::info;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt, env_opt_f32, env_opt_u32, env_opt_u64, must_env,
        validate_http_endpoint, validate_range_f32,
    },
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Resolves `(chat, embedding)` configs for the provider selected by `LLM_KIND`.
///
/// # Errors
/// Any [`ConfigError`] raised while reading the provider-specific variables.
pub fn profiles_from_env() -> Result<(LlmModelConfig, LlmModelConfig), AiLlmError> {
    let provider = match env_opt("LLM_KIND") {
        Some(kind) => kind.parse::<LlmProvider>()?,
        None => LlmProvider::Ollama,
    };

    let (chat, embedding) = match provider {
        LlmProvider::Ollama => (config_ollama_chat()?, config_ollama_embedding()?),
        LlmProvider::OpenAI => (config_openai_chat()?, config_openai_embedding()?),
        LlmProvider::AzureOpenAI => (config_azure_chat()?, config_azure_embedding()?),
    };

    info!(
        provider = ?provider,
        chat_model = %chat.model,
        embedding_model = %embedding.model,
        "LLM profiles resolved from environment"
    );
    Ok((chat, embedding))
}

/// Shared generation knobs (`LLM_MAX_TOKENS`, `LLM_TEMPERATURE`, `LLM_TIMEOUT_SECS`).
struct ChatKnobs {
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: u64,
}

fn chat_knobs(default_temperature: f32) -> Result<ChatKnobs, AiLlmError> {
    let temperature = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(default_temperature);
    validate_range_f32("temperature", temperature, 0.0, 2.0)?;

    Ok(ChatKnobs {
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(temperature),
        timeout_secs: env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS),
    })
}

/* ------------------------------- Ollama -------------------------------- */

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

/// Chat profile for Ollama (`OLLAMA_MODEL`).
pub fn config_ollama_chat() -> Result<LlmModelConfig, AiLlmError> {
    let knobs = chat_knobs(0.7)?;
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("OLLAMA_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        deployment: None,
        api_version: None,
        max_tokens: knobs.max_tokens,
        temperature: knobs.temperature,
        top_p: Some(0.9),
        timeout_secs: Some(knobs.timeout_secs),
    })
}

/// Embedding profile for Ollama (`EMBEDDING_MODEL`).
pub fn config_ollama_embedding() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("EMBEDDING_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        deployment: None,
        api_version: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(DEFAULT_EMBEDDING_TIMEOUT_SECS),
    })
}

/* ------------------------------- OpenAI -------------------------------- */

fn openai_endpoint() -> Result<String, AiLlmError> {
    let url = env_opt("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
    validate_http_endpoint("OPENAI_URL", &url)?;
    Ok(url)
}

/// Chat profile for OpenAI (`OPENAI_MODEL`).
pub fn config_openai_chat() -> Result<LlmModelConfig, AiLlmError> {
    let knobs = chat_knobs(0.7)?;
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: must_env("OPENAI_MODEL")?,
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        deployment: None,
        api_version: None,
        max_tokens: knobs.max_tokens,
        temperature: knobs.temperature,
        top_p: None,
        timeout_secs: Some(knobs.timeout_secs),
    })
}

/// Embedding profile for OpenAI (`OPENAI_EMBEDDING_MODEL`).
pub fn config_openai_embedding() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: env_opt("OPENAI_EMBEDDING_MODEL")
            .unwrap_or_else(|| DEFAULT_OPENAI_EMBEDDING_MODEL.to_string()),
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        deployment: None,
        api_version: None,
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(DEFAULT_EMBEDDING_TIMEOUT_SECS),
    })
}

/* ---------------------------- Azure OpenAI ----------------------------- */

fn azure_base() -> Result<(String, String, String), AiLlmError> {
    let endpoint = must_env("AZURE_OPENAI_ENDPOINT")?;
    validate_http_endpoint("AZURE_OPENAI_ENDPOINT", &endpoint)?;
    Ok((
        endpoint,
        must_env("AZURE_OPENAI_API_KEY")?,
        must_env("AZURE_OPENAI_API_VERSION")?,
    ))
}

/// Chat profile for Azure OpenAI (`AZURE_OPENAI_CHAT_DEPLOYMENT`).
///
/// The deployment name doubles as the model label for logs and health output.
pub fn config_azure_chat() -> Result<LlmModelConfig, AiLlmError> {
    let knobs = chat_knobs(0.7)?;
    let (endpoint, api_key, api_version) = azure_base()?;
    let deployment = must_env("AZURE_OPENAI_CHAT_DEPLOYMENT")?;
    Ok(LlmModelConfig {
        provider: LlmProvider::AzureOpenAI,
        model: deployment.clone(),
        endpoint,
        api_key: Some(api_key),
        deployment: Some(deployment),
        api_version: Some(api_version),
        max_tokens: knobs.max_tokens,
        temperature: knobs.temperature,
        top_p: None,
        timeout_secs: Some(knobs.timeout_secs),
    })
}

/// Embedding profile for Azure OpenAI (`AZURE_OPENAI_EMBEDDING_DEPLOYMENT`).
pub fn config_azure_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let (endpoint, api_key, api_version) = azure_base()?;
    let deployment = must_env("AZURE_OPENAI_EMBEDDING_DEPLOYMENT")?;
    Ok(LlmModelConfig {
        provider: LlmProvider::AzureOpenAI,
        model: deployment.clone(),
        endpoint,
        api_key: Some(api_key),
        deployment: Some(deployment),
        api_version: Some(api_version),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(DEFAULT_EMBEDDING_TIMEOUT_SECS),
    })
}
