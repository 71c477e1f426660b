//! Retrieval over a pre-built collection: similarity or MMR-diversified top-K.

use std::{future::Future, pin::Pin, sync::Arc};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument};

use crate::config::{RagConfig, SearchMode};
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::mmr::mmr_select;
use crate::qdrant_facade::{QdrantFacade, ScoredCandidate};
use crate::record::{RetrievalHit, payload_embedding};

/// Concurrent embedding calls for MMR candidates without a stored vector.
const EMBED_CONCURRENCY: usize = 4;

/// Boxed future returned by [`VectorRetriever`] methods.
pub type RetrieverFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RagError>> + Send + 'a>>;

/// Semantic search over the message corpus.
pub trait VectorRetriever: Send + Sync {
    /// Ordered hits for `question`, best first.
    fn retrieve<'a>(&'a self, question: &'a str) -> RetrieverFuture<'a, Vec<RetrievalHit>>;

    /// Connectivity probe; the default reports healthy without I/O.
    fn health(&self) -> RetrieverFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

/// [`VectorRetriever`] backed by Qdrant plus an embeddings provider.
pub struct QdrantRetriever {
    cfg: RagConfig,
    client: QdrantFacade,
    provider: Arc<dyn EmbeddingsProvider>,
}

impl QdrantRetriever {
    /// # Errors
    /// Returns `RagError::Config` for invalid settings or `RagError::Qdrant`
    /// if the client cannot be built.
    pub fn new(cfg: RagConfig, provider: Arc<dyn EmbeddingsProvider>) -> Result<Self, RagError> {
        let client = QdrantFacade::new(&cfg)?;
        info!(
            collection = %cfg.collection,
            mode = ?cfg.search_mode,
            top_k = cfg.top_k,
            fetch_k = cfg.fetch_k,
            "QdrantRetriever initialized"
        );
        Ok(Self {
            cfg,
            client,
            provider,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    #[instrument(skip_all, fields(collection = %self.cfg.collection, mode = ?self.cfg.search_mode))]
    async fn run(&self, question: &str) -> Result<Vec<RetrievalHit>, RagError> {
        let qv = self.provider.embed(question).await?;
        if let Some(want) = self.cfg.embedding_dim.filter(|&d| d != qv.len()) {
            return Err(RagError::VectorSizeMismatch {
                got: qv.len(),
                want,
            });
        }

        let (pool, with_vectors) = match self.cfg.search_mode {
            SearchMode::Similarity => (self.cfg.top_k, false),
            SearchMode::Mmr => (self.cfg.fetch_k, true),
        };
        let candidates = self
            .client
            .search(qv.clone(), pool, with_vectors, self.cfg.exact_search)
            .await?;

        let hits = select_hits(&self.cfg, &qv, candidates, self.provider.as_ref()).await?;
        debug!(question_len = question.len(), hits = hits.len(), "retrieval done");
        Ok(hits)
    }
}

impl VectorRetriever for QdrantRetriever {
    fn retrieve<'a>(&'a self, question: &'a str) -> RetrieverFuture<'a, Vec<RetrievalHit>> {
        Box::pin(self.run(question))
    }

    fn health(&self) -> RetrieverFuture<'_, ()> {
        Box::pin(async move {
            let points = self.client.probe_collection().await?;
            info!(collection = %self.client.collection(), ?points, "retriever healthy");
            Ok(())
        })
    }
}

/// Turns search candidates into final hits according to the search mode.
///
/// In MMR mode each candidate vector comes from the point's stored vector,
/// then the payload `embedding` field; only candidates with neither are
/// embedded, concurrently.
pub(crate) async fn select_hits(
    cfg: &RagConfig,
    query_vec: &[f32],
    candidates: Vec<ScoredCandidate>,
    provider: &dyn EmbeddingsProvider,
) -> Result<Vec<RetrievalHit>, RagError> {
    let mut hits = Vec::with_capacity(candidates.len());
    let mut vectors = Vec::with_capacity(candidates.len());
    for c in candidates {
        hits.push(RetrievalHit::from_payload(c.score, &c.payload)?);
        vectors.push(c.vector.or_else(|| payload_embedding(&c.payload)));
    }

    let k = usize::try_from(cfg.top_k).unwrap_or(usize::MAX);
    if cfg.search_mode == SearchMode::Similarity || hits.len() <= 1 {
        return Ok(hits.into_iter().take(k).collect());
    }

    let missing: Vec<usize> = vectors
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.is_none().then_some(i))
        .collect();
    let embedded = missing.len();

    let filled = stream::iter(missing)
        .map(|i| {
            let text = hits[i].text.as_str();
            async move { provider.embed(text).await.map(|v| (i, v)) }
        })
        .buffer_unordered(EMBED_CONCURRENCY)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, RagError>>()?;
    for (i, v) in filled {
        vectors[i] = Some(v);
    }

    debug!(
        candidates = hits.len(),
        embedded, "MMR candidate vectors ready"
    );

    let vectors: Vec<Vec<f32>> = vectors.into_iter().map(Option::unwrap_or_default).collect();
    let picked = mmr_select(query_vec, &vectors, k, cfg.mmr_lambda);
    Ok(picked.into_iter().map(|i| hits[i].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps text to a vector: "x..." → [1,0], "y..." → [0,1], anything else → [1,1].
    struct AxisEmbedder {
        calls: AtomicUsize,
    }

    impl EmbeddingsProvider for AxisEmbedder {
        fn embed<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(match text.chars().next() {
                    Some('x') => vec![1.0, 0.0],
                    Some('y') => vec![0.0, 1.0],
                    _ => vec![1.0, 1.0],
                })
            })
        }
    }

    fn cand(score: f32, payload: serde_json::Value) -> ScoredCandidate {
        ScoredCandidate {
            score,
            payload,
            vector: None,
        }
    }

    fn cand_with(score: f32, payload: serde_json::Value, vector: Vec<f32>) -> ScoredCandidate {
        ScoredCandidate {
            vector: Some(vector),
            ..cand(score, payload)
        }
    }

    fn cfg(mode: SearchMode, top_k: u64) -> RagConfig {
        let mut c = RagConfig::new_default("http://localhost:6334", "wc_user");
        c.search_mode = mode;
        c.top_k = top_k;
        c
    }

    #[tokio::test]
    async fn similarity_keeps_search_order_and_truncates() {
        let emb = AxisEmbedder {
            calls: AtomicUsize::new(0),
        };
        let cands = vec![
            cand(0.9, json!({"idx": 4, "text": "x1"})),
            cand(0.8, json!({"idx": 1, "text": "x2"})),
            cand(0.7, json!({"idx": 9, "text": "y1"})),
        ];
        let hits = select_hits(&cfg(SearchMode::Similarity, 2), &[1.0, 0.0], cands, &emb)
            .await
            .unwrap();
        let idx: Vec<u64> = hits.iter().map(|h| h.sequence_index).collect();
        assert_eq!(idx, vec![4, 1]);
        assert_eq!(emb.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mmr_prefers_diverse_candidates_and_reuses_stored_vectors() {
        let emb = AxisEmbedder {
            calls: AtomicUsize::new(0),
        };
        let cands = vec![
            cand(0.9, json!({"idx": 10, "text": "x-a", "embedding": [1.0, 0.0]})),
            cand(0.9, json!({"idx": 11, "text": "x-b"})),
            cand(0.8, json!({"idx": 30, "text": "y-a"})),
        ];
        let hits = select_hits(&cfg(SearchMode::Mmr, 2), &[1.0, 1.0], cands, &emb)
            .await
            .unwrap();
        let idx: Vec<u64> = hits.iter().map(|h| h.sequence_index).collect();
        assert_eq!(idx, vec![10, 30]);
        // Only the two candidates without a stored vector were embedded.
        assert_eq!(emb.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mmr_with_point_vectors_makes_no_embedding_calls() {
        let emb = AxisEmbedder {
            calls: AtomicUsize::new(0),
        };
        let cands: Vec<_> = (0..20u64)
            .map(|i| {
                let v = if i % 2 == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] };
                cand_with(0.9, json!({"idx": i, "text": format!("m{i}")}), v)
            })
            .collect();

        let hits = select_hits(
            &RagConfig::new_default("http://localhost:6334", "wc_user"),
            &[1.0, 0.0],
            cands,
            &emb,
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].sequence_index, 0);
        assert_eq!(emb.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn point_vector_wins_over_payload_embedding() {
        let emb = AxisEmbedder {
            calls: AtomicUsize::new(0),
        };
        // Payload says [1,0], the stored point vector says [0,1].
        let cands = vec![
            cand_with(0.9, json!({"idx": 1, "text": "a", "embedding": [1.0, 0.0]}), vec![0.0, 1.0]),
            cand_with(0.8, json!({"idx": 2, "text": "b"}), vec![1.0, 0.0]),
        ];
        let hits = select_hits(&cfg(SearchMode::Mmr, 1), &[1.0, 0.0], cands, &emb)
            .await
            .unwrap();
        assert_eq!(hits[0].sequence_index, 2);
        assert_eq!(emb.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn payload_without_index_fails_retrieval() {
        let emb = AxisEmbedder {
            calls: AtomicUsize::new(0),
        };
        let cands = vec![cand(0.9, json!({"text": "x"}))];
        let err = select_hits(&cfg(SearchMode::Mmr, 5), &[1.0, 0.0], cands, &emb)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::MissingIndex { .. }));
    }

    struct Fixed;

    impl VectorRetriever for Fixed {
        fn retrieve<'a>(&'a self, _q: &'a str) -> RetrieverFuture<'a, Vec<RetrievalHit>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[tokio::test]
    async fn default_health_is_ok() {
        assert!(Fixed.health().await.is_ok());
    }
}
