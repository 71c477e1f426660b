use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for large language model (LLM) inference.
///
/// Selected at startup via `LLM_KIND` (see [`LlmProvider::from_str`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime for on-device inference.
    Ollama,
    /// OpenAI REST API (or any OpenAI-compatible server).
    OpenAI,
    /// Azure-hosted OpenAI deployments.
    AzureOpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            "azure" | "azure_openai" | "azure-openai" => Ok(LlmProvider::AzureOpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
