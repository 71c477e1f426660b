//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! The rest of the crate only sees [`ScoredCandidate`]s and a collection
//! probe; the builder-heavy client API stays in here.

use std::collections::HashMap;

use crate::config::RagConfig;
use crate::errors::RagError;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::vector_output::Vector as QVector;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    SearchParamsBuilder, SearchPointsBuilder, Value as QValue, VectorOutput, VectorsOutput,
};
use tracing::{debug, info};

/// One scored point returned by [`QdrantFacade::search`].
#[derive(Clone, Debug)]
pub(crate) struct ScoredCandidate {
    pub score: f32,
    pub payload: serde_json::Value,
    /// Stored dense vector; only set when vectors were requested.
    pub vector: Option<Vec<f32>>,
}

/// A facade over the Qdrant client bound to one collection.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// Supports optional API key authentication. No network call is made here.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Fetches collection info and returns the number of stored points (if reported).
    ///
    /// Fails when Qdrant is unreachable or the collection does not exist.
    pub async fn probe_collection(&self) -> Result<Option<u64>, RagError> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        let points = info.result.and_then(|r| r.points_count);
        debug!(collection = %self.collection, ?points, "collection probe ok");
        Ok(points)
    }

    /// Performs a similarity search and returns candidates sorted by score.
    ///
    /// Payloads are always fetched; `with_vectors` also returns each point's
    /// stored vector so callers can re-rank without re-embedding.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        with_vectors: bool,
        exact: bool,
    ) -> Result<Vec<ScoredCandidate>, RagError> {
        info!(
            collection = %self.collection,
            top_k,
            with_vectors,
            exact,
            "searching points"
        );

        let mut builder = SearchPointsBuilder::new(&self.collection, vector, top_k)
            .with_payload(true)
            .with_vectors(with_vectors);
        if exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        let out: Vec<_> = res
            .result
            .into_iter()
            .map(|p| ScoredCandidate {
                score: p.score,
                payload: qpayload_to_json(p.payload),
                vector: dense_vector(p.vectors),
            })
            .collect();

        debug!(hits = out.len(), "search completed");
        Ok(out)
    }
}

/// Dense vector of a point: the unnamed vector, or the only named one.
fn dense_vector(v: Option<VectorsOutput>) -> Option<Vec<f32>> {
    let out = match v?.vectors_options? {
        VectorsOptions::Vector(out) => out,
        VectorsOptions::Vectors(named) if named.vectors.len() == 1 => {
            named.vectors.into_values().next()?
        }
        VectorsOptions::Vectors(_) => return None,
    };
    dense_data(out)
}

fn dense_data(out: VectorOutput) -> Option<Vec<f32>> {
    match out.vector? {
        QVector::Dense(d) if !d.data.is_empty() => Some(d.data),
        _ => None,
    }
}

/// Converts a Qdrant payload (`HashMap<String, qdrant::Value>`) into a JSON object.
fn qpayload_to_json(p: HashMap<String, QValue>) -> serde_json::Value {
    let m = p.into_iter().map(|(k, v)| (k, qvalue_to_json(v))).collect();
    serde_json::Value::Object(m)
}

/// Lists (e.g. stored `embedding` arrays) and nested structs are converted recursively.
fn qvalue_to_json(v: QValue) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind as K;
    match v.kind {
        Some(K::StringValue(s)) => serde_json::Value::String(s),
        Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(K::DoubleValue(f)) => serde_json::json!(f),
        Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(K::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(qvalue_to_json).collect())
        }
        Some(K::StructValue(s)) => qpayload_to_json(s.fields),
        Some(K::NullValue(_)) | None => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::value::Kind as K;
    use qdrant_client::qdrant::{DenseVector, ListValue, NamedVectorsOutput, Struct};

    fn qv(kind: K) -> QValue {
        QValue { kind: Some(kind) }
    }

    #[test]
    fn converts_nested_payload() {
        let mut inner = HashMap::new();
        inner.insert("lang".to_string(), qv(K::StringValue("te".into())));

        let mut p = HashMap::new();
        p.insert("idx".to_string(), qv(K::IntegerValue(42)));
        p.insert("text".to_string(), qv(K::StringValue("User: A\nhi".into())));
        p.insert(
            "embedding".to_string(),
            qv(K::ListValue(ListValue {
                values: vec![qv(K::DoubleValue(0.5)), qv(K::DoubleValue(-1.0))],
            })),
        );
        p.insert("meta".to_string(), qv(K::StructValue(Struct { fields: inner })));
        p.insert("gone".to_string(), QValue { kind: None });

        let json = qpayload_to_json(p);
        assert_eq!(json["idx"], 42);
        assert_eq!(json["text"], "User: A\nhi");
        assert_eq!(json["embedding"], serde_json::json!([0.5, -1.0]));
        assert_eq!(json["meta"]["lang"], "te");
        assert!(json["gone"].is_null());
    }

    fn dense(data: Vec<f32>) -> VectorOutput {
        VectorOutput {
            vector: Some(QVector::Dense(DenseVector { data })),
            ..Default::default()
        }
    }

    #[test]
    fn extracts_unnamed_and_single_named_dense_vectors() {
        let unnamed = VectorsOutput {
            vectors_options: Some(VectorsOptions::Vector(dense(vec![0.1, 0.2]))),
        };
        assert_eq!(dense_vector(Some(unnamed)), Some(vec![0.1, 0.2]));

        let mut one = HashMap::new();
        one.insert("text".to_string(), dense(vec![1.0]));
        let named = VectorsOutput {
            vectors_options: Some(VectorsOptions::Vectors(NamedVectorsOutput { vectors: one })),
        };
        assert_eq!(dense_vector(Some(named)), Some(vec![1.0]));
    }

    #[test]
    fn missing_or_ambiguous_vectors_yield_none() {
        assert_eq!(dense_vector(None), None);

        let mut two = HashMap::new();
        two.insert("a".to_string(), dense(vec![1.0]));
        two.insert("b".to_string(), dense(vec![2.0]));
        let named = VectorsOutput {
            vectors_options: Some(VectorsOptions::Vectors(NamedVectorsOutput { vectors: two })),
        };
        assert_eq!(dense_vector(Some(named)), None);
        assert_eq!(dense_vector(Some(VectorsOutput::default())), None);
    }

    #[test]
    fn facade_rejects_invalid_config() {
        let cfg = RagConfig::new_default("", "wc_user");
        assert!(matches!(QdrantFacade::new(&cfg), Err(RagError::Config(_))));
    }
}
