//! Shared mock backend for integration tests.

#![allow(dead_code)]

use std::borrow::Cow;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use unillm::{
    Backend, ChatRequest, ChatResponse, ChatStream, EmbeddingCapability, EmbeddingRequest,
    EmbeddingResponse, FinishReason, LlmError, ModelInfo, ModelListingCapability, StreamChunk,
    Usage,
};

/// A scriptable backend: fails the first `fail_first` calls with a fixed
/// error, then answers with a canned response. Counts invocations and
/// captures every request it sees.
pub struct MockBackend {
    available: bool,
    fail_first: u32,
    failure: LlmError,
    response: ChatResponse,
    chunks: Vec<Result<StreamChunk, LlmError>>,
    stream_pending: bool,
    stream_error: Option<LlmError>,
    delay: Option<Duration>,
    embeddings: Option<Vec<Vec<f64>>>,
    models: Option<Vec<ModelInfo>>,
    pub calls: AtomicU32,
    pub captured: Mutex<Vec<ChatRequest>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            available: true,
            fail_first: 0,
            failure: LlmError::backend("mock", "scripted failure"),
            response: ChatResponse {
                content: "Hi".to_string(),
                backend: "mock".to_string(),
                model: "mock-model".to_string(),
                finish_reason: Some(FinishReason::Stop),
                ..ChatResponse::default()
            },
            chunks: vec![Ok(StreamChunk::delta("Hi")), Ok(StreamChunk::finished())],
            stream_pending: false,
            stream_error: None,
            delay: None,
            embeddings: None,
            models: None,
            calls: AtomicU32::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.response.content = content.to_string();
        self
    }

    pub fn with_usage(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.response.usage = Usage {
            input_tokens,
            output_tokens,
        };
        self
    }

    pub fn fail_times(mut self, n: u32, failure: LlmError) -> Self {
        self.fail_first = n;
        self.failure = failure;
        self
    }

    pub fn always_fail(mut self, failure: LlmError) -> Self {
        self.fail_first = u32::MAX;
        self.failure = failure;
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<Result<StreamChunk, LlmError>>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn stream_pending(mut self) -> Self {
        self.stream_pending = true;
        self
    }

    pub fn stream_handshake_error(mut self, err: LlmError) -> Self {
        self.stream_error = Some(err);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_embeddings(mut self, embeddings: Vec<Vec<f64>>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.captured.lock().unwrap().last().cloned()
    }

    fn next_outcome(&self) -> Result<(), LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            Err(self.failure.clone())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("mock")
    }

    fn available(&self) -> bool {
        self.available
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.captured.lock().unwrap().push(request);
        // Count the attempt up front so timed-out calls are still recorded.
        let outcome = self.next_outcome();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        outcome?;
        Ok(self.response.clone())
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream, LlmError> {
        self.captured.lock().unwrap().push(request);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.stream_error {
            return Err(err.clone());
        }
        if self.stream_pending {
            return Ok(Box::pin(futures_util::stream::pending()));
        }
        Ok(Box::pin(futures_util::stream::iter(self.chunks.clone())))
    }

    fn as_embedding(&self) -> Option<&dyn EmbeddingCapability> {
        self.embeddings
            .as_ref()
            .map(|_| self as &dyn EmbeddingCapability)
    }

    fn as_model_listing(&self) -> Option<&dyn ModelListingCapability> {
        self.models
            .as_ref()
            .map(|_| self as &dyn ModelListingCapability)
    }
}

#[async_trait]
impl EmbeddingCapability for MockBackend {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, LlmError> {
        self.next_outcome()?;
        Ok(EmbeddingResponse {
            embeddings: self.embeddings.clone().unwrap_or_default(),
            backend: "mock".to_string(),
            model: request.model.unwrap_or_default(),
            usage: Usage::default(),
        })
    }
}

#[async_trait]
impl ModelListingCapability for MockBackend {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        Ok(self.models.clone().unwrap_or_default())
    }
}
