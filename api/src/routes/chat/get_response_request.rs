use serde::{Deserialize, Serialize};

/// Request payload for /get_response.
#[derive(Debug, Deserialize)]
pub struct GetResponseRequest {
    /// Question addressed to the persona.
    pub question: String,
}

/// Response payload for /get_response.
#[derive(Debug, Serialize)]
pub struct GetResponseResponse {
    /// Context blocks that were shown to the model, one per retrieval hit.
    pub retrieved_docs: Vec<String>,
    /// Persona reply, or the generation failure text.
    pub response: String,
}
