//! Vector retrieval over a pre-built Qdrant collection of chat messages.
//!
//! - [`VectorRetriever`]: the seam used by the chat pipeline
//! - [`QdrantRetriever`]: similarity or MMR search, hits carry the message `sequence_index`
//! - [`EmbeddingsProvider`]: query/candidate embeddings, with [`LlmEmbedder`] over the LLM service

mod config;
pub mod embed;
mod errors;
mod mmr;
mod qdrant_facade;
mod record;
mod retrieve;

pub use config::{RagConfig, SearchMode};
pub use embed::EmbeddingsProvider;
pub use embed::llm_embedder::LlmEmbedder;
pub use errors::RagError;
pub use mmr::mmr_select;
pub use record::RetrievalHit;
pub use retrieve::{QdrantRetriever, RetrieverFuture, VectorRetriever};
