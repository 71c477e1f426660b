//! Core data models used by the library.

use serde::Serialize;
use serde_json::Value;

use crate::errors::RagError;

/// A single retrieval hit: which message matched and how well.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetrievalHit {
    /// Position of the matched message in the corpus.
    pub sequence_index: u64,
    pub score: f32,
    pub text: String,
}

impl RetrievalHit {
    /// Builds a hit from a point payload carrying `idx` and `text`.
    ///
    /// `idx` may be stored as an integer or as an integral float
    /// (JSON exporters sometimes emit `3.0`).
    pub fn from_payload(score: f32, payload: &Value) -> Result<Self, RagError> {
        let sequence_index = payload
            .get("idx")
            .and_then(index_from_json)
            .ok_or(RagError::MissingIndex { score })?;

        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RagError::Parse(format!("payload for idx {sequence_index} has no string `text`"))
            })?
            .to_string();

        Ok(Self {
            sequence_index,
            score,
            text,
        })
    }
}

fn index_from_json(v: &Value) -> Option<u64> {
    if let Some(u) = v.as_u64() {
        return Some(u);
    }
    let f = v.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// Reads a stored vector from the payload `embedding` field, if present.
pub(crate) fn payload_embedding(payload: &Value) -> Option<Vec<f32>> {
    let arr = payload.get("embedding")?.as_array()?;
    let v: Vec<f32> = arr
        .iter()
        .filter_map(Value::as_f64)
        .map(|f| f as f32)
        .collect();
    (!v.is_empty() && v.len() == arr.len()).then_some(v)
}
