//! Embedding request and response types.

use serde::{Deserialize, Serialize};

use super::chat::Usage;

/// A batch embedding request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub input: Vec<String>,
    /// `None` means the client/backend default embedding model.
    pub model: Option<String>,
}

impl EmbeddingRequest {
    pub fn new(input: Vec<String>) -> Self {
        Self { input, model: None }
    }
}

/// One embedding vector per input, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embeddings: Vec<Vec<f64>>,
    pub backend: String,
    pub model: String,
    #[serde(default)]
    pub usage: Usage,
}
