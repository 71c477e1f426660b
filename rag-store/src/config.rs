//! Runtime and collection configuration.

use std::str::FromStr;

use crate::errors::RagError;

/// How candidates are picked from the collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Plain top-K nearest neighbours.
    Similarity,
    /// Fetch `fetch_k` neighbours, keep `top_k` by maximal marginal relevance.
    Mmr,
}

impl FromStr for SearchMode {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mmr" => Ok(SearchMode::Mmr),
            "similarity" | "sim" => Ok(SearchMode::Similarity),
            other => Err(RagError::Config(format!(
                "unknown search mode `{other}` (expected `mmr` or `similarity`)"
            ))),
        }
    }
}

/// Configuration for retrieval over a pre-built collection.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    pub search_mode: SearchMode,
    /// Number of hits returned to the caller.
    pub top_k: u64,
    /// Candidate pool for MMR; ignored in similarity mode.
    pub fetch_k: u64,
    /// MMR relevance/diversity balance in `[0, 1]` (1.0 = pure relevance).
    pub mmr_lambda: f32,
    /// Expected embedding dimension, checked on every query vector.
    pub embedding_dim: Option<usize>,
}

impl RagConfig {
    /// Defaults matching the usual LangChain-style retriever: MMR, k=5, fetch_k=20, lambda=0.5.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            exact_search: false,
            search_mode: SearchMode::Mmr,
            top_k: 5,
            fetch_k: 20,
            mmr_lambda: 0.5,
            embedding_dim: None,
        }
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be > 0".into()));
        }
        if self.search_mode == SearchMode::Mmr && self.fetch_k < self.top_k {
            return Err(RagError::Config(format!(
                "fetch_k ({}) must be >= top_k ({}) in MMR mode",
                self.fetch_k, self.top_k
            )));
        }
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return Err(RagError::Config("mmr_lambda must be within [0, 1]".into()));
        }
        if self.embedding_dim == Some(0) {
            return Err(RagError::Config("embedding_dim must be > 0".into()));
        }
        Ok(())
    }
}
