//! The backend capability contract.
//!
//! A [`Backend`] is a pluggable provider of text generation, injected into
//! the [`Client`](crate::client::Client). Optional capabilities (embeddings,
//! model listing) are probed at runtime via `as_*` accessors; a backend that
//! supports one overrides the accessor to return `Some(self)`.

use std::borrow::Cow;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::streaming::ChatStream;
use crate::types::{ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, ModelInfo};

/// The interface every backend adapter must implement.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Canonical backend id (e.g. "anthropic", "openai").
    fn name(&self) -> Cow<'static, str>;

    /// Whether the backend is properly configured and usable.
    fn available(&self) -> bool {
        true
    }

    /// Sends a request and returns the complete response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Sends a request and streams the response incrementally.
    ///
    /// The returned stream is finite and non-restartable: it ends after a
    /// chunk flagged done, after an error item, or on exhaustion.
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream, LlmError>;

    /// Embedding capability, if supported.
    fn as_embedding(&self) -> Option<&dyn EmbeddingCapability> {
        None
    }

    /// Model listing capability, if supported.
    fn as_model_listing(&self) -> Option<&dyn ModelListingCapability> {
        None
    }
}

/// Optional capability: text embeddings.
#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, LlmError>;
}

/// Optional capability: listing available models.
#[async_trait]
pub trait ModelListingCapability: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;
}
