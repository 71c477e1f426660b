//! Health probes for LLM backends (Ollama, OpenAI, Azure OpenAI).
//!
//! - Ollama: `GET {endpoint}/api/tags` (best-effort model existence check)
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth (best-effort model existence check)
//! - Azure OpenAI: `GET {endpoint}/openai/models?api-version=..` with `api-key` auth
//!
//! [`HealthService::check`] never fails; errors are mapped to `ok=false`.
//! Provider-specific probes (`try_*`) return strict `Result`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, is_http_endpoint, make_snippet};

const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend/provider (e.g., "Ollama", "AzureOpenAI").
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Model or deployment the probe looked for.
    pub model: Option<String>,
    pub ok: bool,
    /// Measured HTTP latency in milliseconds for the main probe.
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.trim().to_string(),
            model: Some(cfg.model.clone()),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// A health checker that reuses a single HTTP client across probes.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds, default 10).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!(
            default_timeout_secs = timeout.as_secs(),
            "HealthService initialized"
        );

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks a single config, routing to the provider-specific probe.
    ///
    /// Any failure is converted to `HealthStatus { ok: false, .. }`.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        if !is_http_endpoint(&cfg.endpoint) {
            warn!(
                provider = ?cfg.provider,
                endpoint = %cfg.endpoint,
                "invalid endpoint (empty or missing http/https)"
            );
            return HealthStatus::new(cfg, false, 0, "endpoint is empty or missing http/https");
        }

        let start = Instant::now();
        let result = match cfg.provider {
            LlmProvider::Ollama => self.try_probe_ollama(cfg).await,
            LlmProvider::OpenAI => self.try_probe_openai(cfg).await,
            LlmProvider::AzureOpenAI => self.try_probe_azure(cfg).await,
        };

        match result {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    model = %status.model.as_deref().unwrap_or("n/a"),
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status =
                    HealthStatus::new(cfg, false, start.elapsed().as_millis(), err.to_string());
                warn!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    latency_ms = status.latency_ms,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Checks several configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        debug!(count = configs.len(), "running batch health probes");
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    /// Sends the GET and returns the successful response plus latency.
    async fn get_ok(
        &self,
        cfg: &LlmModelConfig,
        url: String,
        auth: Option<(header::HeaderName, header::HeaderValue)>,
    ) -> Result<(reqwest::Response, u128), AiLlmError> {
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
            .min(self.default_timeout);

        debug!(provider = ?cfg.provider, model = %cfg.model, "GET {}", url);

        let start = Instant::now();
        let mut req = self.client.get(&url).timeout(timeout);
        if let Some((name, value)) = auth {
            req = req.header(name, value);
        }
        let resp = req.send().await?;
        let latency = start.elapsed().as_millis();

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                provider = ?cfg.provider,
                %url,
                %status,
                %snippet,
                latency_ms = latency,
                "health probe returned non-success status"
            );

            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })
            .into());
        }

        Ok((resp, latency))
    }

    /// Ollama: `GET /api/tags`, then look for `cfg.model` among the tags.
    async fn try_probe_ollama(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let url = format!("{}/api/tags", base(cfg));
        let (resp, latency) = self.get_ok(cfg, url, None).await?;

        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            models: Option<Vec<Tag>>,
        }

        match resp.json::<Tags>().await {
            Ok(Tags {
                models: Some(models),
            }) => {
                // `llama3` matches `llama3:latest`
                let exists = models.iter().any(|m| {
                    m.name == cfg.model || m.name.strip_suffix(":latest") == Some(&cfg.model)
                });
                Ok(if exists {
                    HealthStatus::new(cfg, true, latency, "Ollama is healthy; model is available")
                } else {
                    HealthStatus::new(
                        cfg,
                        false,
                        latency,
                        "Ollama is up, but model not found in /api/tags",
                    )
                })
            }
            Ok(Tags { models: None }) => Ok(HealthStatus::new(
                cfg,
                true,
                latency,
                "Ollama is healthy; tags response without `models` field",
            )),
            Err(e) => {
                warn!(error = %e, "failed to decode /api/tags; treating server as reachable");
                Ok(HealthStatus::new(
                    cfg,
                    true,
                    latency,
                    format!("Ollama is reachable; failed to decode /api/tags: {e}"),
                ))
            }
        }
    }

    /// OpenAI: `GET /v1/models`, then look for `cfg.model` in `data[].id`.
    async fn try_probe_openai(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let api_key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| HealthError::Decode("missing OpenAI API key".into()))?;
        let auth = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;

        let url = format!("{}/v1/models", base(cfg));
        let (resp, latency) = self
            .get_ok(cfg, url, Some((header::AUTHORIZATION, auth)))
            .await?;

        match resp.json::<ModelList>().await {
            Ok(list) => {
                let exists = list.data.iter().any(|m| m.id == cfg.model);
                Ok(if exists {
                    HealthStatus::new(cfg, true, latency, "OpenAI is healthy; model is available")
                } else {
                    HealthStatus::new(
                        cfg,
                        false,
                        latency,
                        "OpenAI is up, but model not found in /v1/models",
                    )
                })
            }
            Err(e) => {
                warn!(error = %e, "failed to decode /v1/models; treating server as reachable");
                Ok(HealthStatus::new(
                    cfg,
                    true,
                    latency,
                    format!("OpenAI is reachable; failed to decode /v1/models: {e}"),
                ))
            }
        }
    }

    /// Azure OpenAI: `GET /openai/models`. Deployments are not listed there,
    /// so a 2xx with valid credentials is treated as healthy.
    async fn try_probe_azure(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let api_key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| HealthError::Decode("missing Azure OpenAI API key".into()))?;
        let auth = header::HeaderValue::from_str(api_key)
            .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;

        let version = cfg
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_AZURE_API_VERSION);
        let url = format!("{}/openai/models?api-version={version}", base(cfg));
        let (_resp, latency) = self
            .get_ok(
                cfg,
                url,
                Some((header::HeaderName::from_static("api-key"), auth)),
            )
            .await?;

        Ok(HealthStatus::new(
            cfg,
            true,
            latency,
            "Azure OpenAI is healthy; credentials accepted",
        ))
    }
}

#[derive(Deserialize)]
struct ModelItem {
    id: String,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelItem>,
}

fn base(cfg: &LlmModelConfig) -> &str {
    cfg.endpoint.trim().trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "llama3".into(),
            endpoint: endpoint.into(),
            api_key: None,
            deployment: None,
            api_version: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        }
    }

    #[tokio::test]
    async fn invalid_endpoint_is_reported_without_network() {
        let svc = HealthService::new(Some(1)).unwrap();
        let status = svc.check(&cfg("localhost:11434")).await;
        assert!(!status.ok);
        assert_eq!(status.latency_ms, 0);
        assert_eq!(status.provider, "Ollama");
    }

    #[tokio::test]
    async fn openai_probe_without_key_fails_softly() {
        let svc = HealthService::new(Some(1)).unwrap();
        let mut c = cfg("https://api.openai.com");
        c.provider = LlmProvider::OpenAI;
        let status = svc.check(&c).await;
        assert!(!status.ok);
        assert!(status.message.contains("missing OpenAI API key"));
    }

    #[test]
    fn base_trims_trailing_slash() {
        assert_eq!(base(&cfg("http://localhost:11434/ ")), "http://localhost:11434");
    }
}
