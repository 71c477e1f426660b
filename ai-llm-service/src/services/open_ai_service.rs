//! OpenAI-compatible service for chat completions and embeddings.
//!
//! Minimal, non-streaming client around the OpenAI REST API. The same client
//! serves Azure OpenAI deployments; only URL layout and auth header differ:
//!
//! | provider     | chat URL                                                              | auth                    |
//! |--------------|-----------------------------------------------------------------------|-------------------------|
//! | OpenAI       | `{endpoint}/v1/chat/completions`                                      | `Authorization: Bearer` |
//! | Azure OpenAI | `{endpoint}/openai/deployments/{dep}/chat/completions?api-version=..` | `api-key`               |
//!
//! Errors are normalized via unified error types in `error_handler`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, is_http_endpoint,
        make_snippet,
    },
};

/// Thin client for OpenAI and Azure OpenAI.
///
/// Constructed from a complete [`LlmModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers).
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    provider: Provider,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is neither OpenAI nor Azure OpenAI
    /// - `MissingApiKey` if `cfg.api_key` is `None`
    /// - `MissingDeployment` for Azure configs without a deployment
    /// - `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let provider = match cfg.provider {
            LlmProvider::OpenAI => Provider::OpenAI,
            LlmProvider::AzureOpenAI => Provider::AzureOpenAI,
            LlmProvider::Ollama => {
                return Err(
                    ProviderError::new(Provider::OpenAI, ProviderErrorKind::InvalidProvider)
                        .into(),
                );
            }
        };

        let api_key = cfg
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::new(provider, ProviderErrorKind::MissingApiKey))?;

        if !is_http_endpoint(&cfg.endpoint) {
            return Err(ProviderError::new(
                provider,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let (url_chat, url_embeddings) = build_urls(&cfg, provider)?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        let (auth_name, auth_value) = match provider {
            Provider::AzureOpenAI => (header::HeaderName::from_static("api-key"), api_key),
            _ => (header::AUTHORIZATION, format!("Bearer {api_key}")),
        };
        headers.insert(
            auth_name,
            header::HeaderValue::from_str(&auth_value).map_err(|e| {
                ProviderError::new(
                    provider,
                    ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
                )
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        info!(
            provider = %provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            provider,
            url_chat,
            url_embeddings,
        })
    }

    /// Performs a **non-streaming** chat completion request.
    ///
    /// Minimal `messages` array:
    /// - optional system message (if provided)
    /// - user message with `prompt`.
    ///
    /// # Errors
    /// - `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    /// - `Decode` if the JSON cannot be parsed
    /// - `EmptyChoices` if no choices are returned
    #[instrument(skip_all, fields(provider = %self.provider, model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = ChatCompletionRequest::from_cfg(&self.cfg, self.provider, prompt, system);

        debug!(
            prompt_len = prompt.len(),
            has_system = system.is_some(),
            "POST {}", self.url_chat
        );

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                latency_ms = started.elapsed().as_millis(),
                "chat completion returned non-success status"
            );

            return Err(ProviderError::new(
                self.provider,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url,
                    snippet,
                }),
            )
            .into());
        }

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            error!(
                error = %e,
                latency_ms = started.elapsed().as_millis(),
                "failed to decode chat completion response"
            );
            ProviderError::new(
                self.provider,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `choices[0].message.content`"
                )),
            )
        })?;

        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| ProviderError::new(self.provider, ProviderErrorKind::EmptyChoices))?;

        info!(
            latency_ms = started.elapsed().as_millis(),
            "chat completion completed"
        );

        Ok(content)
    }

    /// Retrieves a single embeddings vector.
    ///
    /// # Errors
    /// - `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    /// - `Decode` if the JSON cannot be parsed or `data` is empty
    #[instrument(skip_all, fields(provider = %self.provider, model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let started = Instant::now();
        let body = EmbeddingsRequest {
            model: model_field(&self.cfg, self.provider),
            input,
        };

        debug!(input_len = input.len(), "POST {}", self.url_embeddings);

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embeddings.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                latency_ms = started.elapsed().as_millis(),
                "embeddings returned non-success status"
            );

            return Err(ProviderError::new(
                self.provider,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url,
                    snippet,
                }),
            )
            .into());
        }

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                self.provider,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `data[0].embedding`"
                )),
            )
        })?;

        let first = out.data.into_iter().next().ok_or_else(|| {
            ProviderError::new(
                self.provider,
                ProviderErrorKind::Decode("empty `data` in embeddings response".into()),
            )
        })?;

        debug!(
            latency_ms = started.elapsed().as_millis(),
            dim = first.embedding.len(),
            "embeddings completed"
        );

        Ok(first.embedding)
    }
}

/// Derives `(chat, embeddings)` URLs for the provider.
fn build_urls(cfg: &LlmModelConfig, provider: Provider) -> Result<(String, String), AiLlmError> {
    let base = cfg.endpoint.trim().trim_end_matches('/');
    match provider {
        Provider::AzureOpenAI => {
            let deployment = cfg
                .deployment
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| ProviderError::new(provider, ProviderErrorKind::MissingDeployment))?;
            let version = cfg.api_version.as_deref().unwrap_or("2024-06-01");
            let dep_base = format!("{base}/openai/deployments/{deployment}");
            Ok((
                format!("{dep_base}/chat/completions?api-version={version}"),
                format!("{dep_base}/embeddings?api-version={version}"),
            ))
        }
        _ => Ok((
            format!("{base}/v1/chat/completions"),
            format!("{base}/v1/embeddings"),
        )),
    }
}

/// Azure routes by deployment, so the body-level `model` is omitted there.
fn model_field(cfg: &LlmModelConfig, provider: Provider) -> Option<&str> {
    match provider {
        Provider::AzureOpenAI => None,
        _ => Some(cfg.model.as_str()),
    }
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Minimal request body for chat completions (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(
        cfg: &'a LlmModelConfig,
        provider: Provider,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: sys,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        Self {
            model: model_field(cfg, provider),
            messages,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::AzureOpenAI,
            model: "gpt4o".into(),
            endpoint: "https://example.openai.azure.com/".into(),
            api_key: Some("secret".into()),
            deployment: Some("gpt4o".into()),
            api_version: Some("2024-02-01".into()),
            max_tokens: None,
            temperature: Some(0.7),
            top_p: None,
            timeout_secs: Some(10),
        }
    }

    #[test]
    fn azure_urls_route_by_deployment() {
        let svc = OpenAiService::new(azure_cfg()).expect("valid azure config");
        assert_eq!(
            svc.url_chat,
            "https://example.openai.azure.com/openai/deployments/gpt4o/chat/completions?api-version=2024-02-01"
        );
        assert!(svc.url_embeddings.ends_with("/deployments/gpt4o/embeddings?api-version=2024-02-01"));
    }

    #[test]
    fn openai_urls_use_v1_paths() {
        let cfg = LlmModelConfig {
            provider: LlmProvider::OpenAI,
            endpoint: "https://api.openai.com/".into(),
            deployment: None,
            ..azure_cfg()
        };
        let (chat, embeddings) = build_urls(&cfg, Provider::OpenAI).unwrap();
        assert_eq!(chat, "https://api.openai.com/v1/chat/completions");
        assert_eq!(embeddings, "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn azure_without_deployment_is_rejected() {
        let mut cfg = azure_cfg();
        cfg.deployment = None;
        let err = OpenAiService::new(cfg).unwrap_err();
        assert!(err.to_string().contains("missing deployment"));
    }

    #[test]
    fn openai_requires_api_key() {
        let cfg = LlmModelConfig {
            provider: LlmProvider::OpenAI,
            endpoint: "https://api.openai.com".into(),
            api_key: None,
            deployment: None,
            api_version: None,
            ..azure_cfg()
        };
        let err = OpenAiService::new(cfg).unwrap_err();
        assert!(err.to_string().contains("missing API key"));
    }

    #[test]
    fn chat_body_puts_system_first_and_omits_model_for_azure() {
        let cfg = azure_cfg();
        let req = ChatCompletionRequest::from_cfg(&cfg, Provider::AzureOpenAI, "hello", Some("be brief"));
        let body = serde_json::to_value(req).unwrap();
        assert!(body.get("model").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");

        let openai = LlmModelConfig {
            provider: LlmProvider::OpenAI,
            ..azure_cfg()
        };
        let req = ChatCompletionRequest::from_cfg(&openai, Provider::OpenAI, "hello", None);
        let body = serde_json::to_value(req).unwrap();
        assert_eq!(body["model"], "gpt4o");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }
}
