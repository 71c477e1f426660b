//! Runtime configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use rag_store::{RagConfig, SearchMode};

use crate::error::BootstrapError;
use crate::persona::DEFAULT_SAMPLE_SIZE;
use crate::window::WindowConfig;

/// Everything needed to build a [`crate::ChatContext`], minus the LLM profiles.
#[derive(Clone, Debug)]
pub struct ContextorConfig {
    /// Corpus identifier, also reported as `user_file`.
    pub corpus_id: String,
    pub corpus_path: PathBuf,
    pub primary_speaker: String,
    pub persona_sample_size: usize,
    pub window: WindowConfig,
    pub prompt_template_path: Option<PathBuf>,
    pub rag: RagConfig,
}

impl ContextorConfig {
    /// Build from process environment.
    ///
    /// # Errors
    /// [`BootstrapError::MissingEnv`] / [`BootstrapError::InvalidEnv`] for absent
    /// or unparsable values.
    pub fn from_env() -> Result<Self, BootstrapError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup (empty values count as unset).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BootstrapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let corpus_id = env.get("CORPUS_ID").unwrap_or_else(|| "wc_user".into());
        let corpus_path = match env.get("CORPUS_PATH") {
            Some(p) => PathBuf::from(p),
            None => {
                let data_dir = env.get("DATA_DIR").unwrap_or_else(|| "data".into());
                PathBuf::from(data_dir)
                    .join(&corpus_id)
                    .join(format!("{corpus_id}_docs.jsonl"))
            }
        };

        let window = WindowConfig {
            radius: env.parse("WINDOW_RADIUS", 1u64)?,
            span_multiplier: env.parse("WINDOW_SPAN_MULTIPLIER", 2u64)?,
        };
        if window.span_multiplier == 0 {
            return Err(BootstrapError::InvalidEnv {
                var: "WINDOW_SPAN_MULTIPLIER",
                reason: "must be >= 1".into(),
            });
        }

        let persona_sample_size = env.parse("PERSONA_SAMPLE_SIZE", DEFAULT_SAMPLE_SIZE)?;
        if persona_sample_size == 0 {
            return Err(BootstrapError::InvalidEnv {
                var: "PERSONA_SAMPLE_SIZE",
                reason: "must be >= 1".into(),
            });
        }

        let mut rag = RagConfig::new_default(
            env.get("QDRANT_URL")
                .unwrap_or_else(|| "http://localhost:6334".into()),
            env.get("QDRANT_COLLECTION")
                .unwrap_or_else(|| corpus_id.clone()),
        );
        rag.qdrant_api_key = env.get("QDRANT_API_KEY");
        rag.search_mode = env.parse("RAG_SEARCH_MODE", SearchMode::Mmr)?;
        rag.top_k = env.parse("RAG_TOP_K", rag.top_k)?;
        rag.fetch_k = env.parse("RAG_FETCH_K", rag.fetch_k)?;
        rag.mmr_lambda = env.parse("MMR_LAMBDA", rag.mmr_lambda)?;
        rag.exact_search = env.flag("RAG_EXACT_SEARCH")?;
        rag.embedding_dim = env.parse_opt("EMBEDDING_DIM")?;

        Ok(Self {
            corpus_path,
            corpus_id,
            primary_speaker: env.must("PRIMARY_SPEAKER")?,
            persona_sample_size,
            window,
            prompt_template_path: env.get("PROMPT_TEMPLATE_PATH").map(PathBuf::from),
            rag,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, k: &str) -> Option<String> {
        (self.0)(k)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn must(&self, k: &'static str) -> Result<String, BootstrapError> {
        self.get(k).ok_or(BootstrapError::MissingEnv(k))
    }

    fn parse_opt<T>(&self, k: &'static str) -> Result<Option<T>, BootstrapError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(k)
            .map(|v| {
                v.parse::<T>().map_err(|e| BootstrapError::InvalidEnv {
                    var: k,
                    reason: format!("`{v}`: {e}"),
                })
            })
            .transpose()
    }

    fn parse<T>(&self, k: &'static str, dflt: T) -> Result<T, BootstrapError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_opt(k)?.unwrap_or(dflt))
    }

    fn flag(&self, k: &'static str) -> Result<bool, BootstrapError> {
        match self.get(k).map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("false" | "0" | "no") => Ok(false),
            Some("true" | "1" | "yes") => Ok(true),
            Some(other) => Err(BootstrapError::InvalidEnv {
                var: k,
                reason: format!("`{other}` is not a boolean"),
            }),
        }
    }
}
