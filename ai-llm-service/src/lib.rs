//! Shared LLM access for the persona chat backend.
//!
//! Providers: Ollama, OpenAI, Azure OpenAI. Two profiles are used by the
//! application: `chat` (reply generation) and `embedding` (query vectors).

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::default_config::profiles_from_env;
pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::AiLlmError;
pub use health_service::HealthStatus;
pub use service_profiles::LlmServiceProfiles;
