//! The client facade.
//!
//! A [`Client`] owns the only shared mutable state in this crate: its
//! configuration, behind a reader/writer lock. Every call starts by taking a
//! snapshot (a value copy under the read lock) and runs against that snapshot
//! alone, so a configuration change on one task never mixes into a request
//! already in flight on another. Setters write-lock around exactly one field
//! assignment and never touch the network.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::builder::ClientBuilder;
use crate::error::LlmError;
use crate::hooks::Hook;
use crate::retry::{RetryContext, RetryPolicy, run_with_retry};
use crate::streaming::{ChatStreamHandle, forward_stream};
use crate::traits::Backend;
use crate::types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, Message, ModelInfo, Tool,
};
use crate::validation::{validate_messages, validate_request};

/// The client's long-lived mutable configuration.
///
/// Cloning produces the per-call snapshot: every field is either `Copy`, a
/// small owned value, or a shared reference (`Arc`), so a snapshot is an O(1)
/// field copy without deep-copying the tool list.
#[derive(Clone)]
pub(crate) struct ClientConfig {
    pub(crate) backend: Option<Arc<dyn Backend>>,
    pub(crate) timeout: Duration,
    pub(crate) max_input_len: usize,
    pub(crate) system_prompt: String,
    pub(crate) model: Option<String>,
    pub(crate) max_tokens: Option<u32>,
    pub(crate) temperature: Option<f64>,
    pub(crate) presence_penalty: Option<f64>,
    pub(crate) frequency_penalty: Option<f64>,
    pub(crate) embedding_model: Option<String>,
    pub(crate) tools: Arc<[Tool]>,
    pub(crate) retry: RetryPolicy,
    pub(crate) hook: Option<Hook>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: None,
            timeout: Duration::from_secs(60),
            max_input_len: 100_000,
            system_prompt: String::new(),
            model: None,
            max_tokens: None,
            temperature: None,
            presence_penalty: None,
            frequency_penalty: None,
            embedding_model: None,
            tools: Arc::from(Vec::new()),
            retry: RetryPolicy::default(),
            hook: None,
        }
    }
}

/// A unified client over pluggable text-generation backends.
///
/// The client is safe to share (`Arc<Client>`) across tasks: requests take a
/// configuration snapshot up front, and setters only block other setters and
/// snapshot reads, never in-flight network calls.
pub struct Client {
    config: RwLock<ClientConfig>,
}

impl Client {
    /// Creates a client with the given backend and default settings.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::from_config(ClientConfig {
            backend: Some(backend),
            ..ClientConfig::default()
        })
    }

    /// Starts a validated builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_config(config: ClientConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    fn snapshot(&self) -> ClientConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_config_mut(&self, f: impl FnOnce(&mut ClientConfig)) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut config);
    }

    /// Sends a one-shot text completion request.
    pub async fn complete(&self, prompt: impl Into<String>) -> Result<ChatResponse, LlmError> {
        self.chat(vec![Message::user(prompt)]).await
    }

    /// Sends a multi-turn conversation request with client defaults.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<ChatResponse, LlmError> {
        self.chat_request(ChatRequest::new(messages)).await
    }

    /// Sends a chat request. Request-level parameters win over client
    /// defaults; unset fields fall back to the snapshot's defaults.
    pub async fn chat_request(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let snapshot = self.snapshot();
        let backend = snapshot.backend.clone().ok_or(LlmError::NoBackend)?;
        let request = assemble_chat(&snapshot, request)?;

        let backend_name = backend.name();
        let cx = RetryContext {
            backend: &backend_name,
            model: request.model.as_deref().unwrap_or(""),
            timeout: snapshot.timeout,
            policy: snapshot.retry,
            hook: snapshot.hook.as_ref(),
        };
        let backend_ref = &backend;
        run_with_retry(cx, "chat", || {
            let request = request.clone();
            async move {
                let response = backend_ref.chat(request).await?;
                if response.is_empty() {
                    return Err(LlmError::EmptyResponse);
                }
                Ok(response)
            }
        })
        .await
    }

    /// Streams a multi-turn conversation request.
    ///
    /// Streaming goes through the same validation and assembly as
    /// [`chat`](Self::chat) but is attempted exactly once: a partially
    /// delivered stream cannot be safely replayed, so the retry engine is
    /// bypassed entirely.
    pub async fn stream(&self, messages: Vec<Message>) -> Result<ChatStreamHandle, LlmError> {
        self.stream_request(ChatRequest::new(messages)).await
    }

    /// Streams a chat request with explicit parameters.
    pub async fn stream_request(&self, request: ChatRequest) -> Result<ChatStreamHandle, LlmError> {
        let snapshot = self.snapshot();
        let backend = snapshot.backend.clone().ok_or(LlmError::NoBackend)?;
        let request = assemble_chat(&snapshot, request)?;

        let deadline = tokio::time::Instant::now() + snapshot.timeout;
        let inner = match timeout(snapshot.timeout, backend.chat_stream(request)).await {
            Ok(res) => res?,
            Err(_) => return Err(LlmError::Timeout),
        };
        Ok(forward_stream(inner, deadline))
    }

    /// Streams a response and writes each content delta to `writer`.
    pub async fn stream_to_writer<W>(
        &self,
        messages: Vec<Message>,
        writer: &mut W,
    ) -> Result<(), LlmError>
    where
        W: AsyncWrite + Unpin,
    {
        use futures_util::StreamExt;

        let handle = self.stream(messages).await?;
        let mut stream = handle.stream;
        while let Some(item) = stream.next().await {
            let chunk = item?;
            if !chunk.content.is_empty() {
                writer
                    .write_all(chunk.content.as_bytes())
                    .await
                    .map_err(|e| LlmError::backend("stream_to_writer", e.to_string()))?;
            }
            if chunk.done {
                break;
            }
        }
        Ok(())
    }

    /// Embeds a batch of texts using the client's default embedding model.
    ///
    /// Fails with [`LlmError::UnsupportedCapability`] if the configured
    /// backend does not implement embeddings.
    pub async fn embed(&self, input: Vec<String>) -> Result<EmbeddingResponse, LlmError> {
        self.embed_request(EmbeddingRequest::new(input)).await
    }

    /// Embeds with explicit parameters; the request-level model wins over the
    /// client default.
    pub async fn embed_request(
        &self,
        mut request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, LlmError> {
        let snapshot = self.snapshot();
        let backend = snapshot.backend.clone().ok_or(LlmError::NoBackend)?;

        // Classify bad input the same way chat does: validation first, then
        // the capability probe.
        if request.input.iter().all(String::is_empty) {
            return Err(LlmError::EmptyInput);
        }
        let total: usize = request.input.iter().map(String::len).sum();
        if total > snapshot.max_input_len {
            return Err(LlmError::InputTooLong {
                len: total,
                max: snapshot.max_input_len,
            });
        }

        let embedder = backend
            .as_embedding()
            .ok_or(LlmError::UnsupportedCapability("embeddings"))?;
        request.model = request.model.or_else(|| snapshot.embedding_model.clone());

        let backend_name = backend.name();
        let cx = RetryContext {
            backend: &backend_name,
            model: request.model.as_deref().unwrap_or(""),
            timeout: snapshot.timeout,
            policy: snapshot.retry,
            hook: snapshot.hook.as_ref(),
        };
        run_with_retry(cx, "embed", || {
            let request = request.clone();
            async move { embedder.embed(request).await }
        })
        .await
    }

    /// Lists available models, if the backend supports model listing.
    pub async fn models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let snapshot = self.snapshot();
        let backend = snapshot.backend.clone().ok_or(LlmError::NoBackend)?;
        let lister = backend
            .as_model_listing()
            .ok_or(LlmError::UnsupportedCapability("model listing"))?;
        match timeout(snapshot.timeout, lister.list_models()).await {
            Ok(res) => res,
            Err(_) => Err(LlmError::Timeout),
        }
    }

    /// Returns the configured backend, if any.
    pub fn backend(&self) -> Option<Arc<dyn Backend>> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .backend
            .clone()
    }

    /// Whether a backend is configured and reports itself available.
    pub fn is_available(&self) -> bool {
        self.backend().is_some_and(|b| b.available())
    }

    /// Replaces the backend. In-flight requests keep the backend they
    /// snapshotted.
    pub fn set_backend(&self, backend: Arc<dyn Backend>) {
        self.with_config_mut(|c| c.backend = Some(backend));
    }

    /// Updates the default model.
    pub fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        self.with_config_mut(|c| c.model = Some(model));
    }

    /// Updates the system prompt prepended to all requests.
    pub fn set_system_prompt(&self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.with_config_mut(|c| c.system_prompt = prompt);
    }

    /// Replaces the default tool list.
    pub fn set_tools(&self, tools: Vec<Tool>) {
        let tools: Arc<[Tool]> = tools.into();
        self.with_config_mut(|c| c.tools = tools);
    }

    /// Replaces the event hook.
    pub fn set_hook(&self, hook: Hook) {
        self.with_config_mut(|c| c.hook = Some(hook));
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Client")
            .field(
                "backend",
                &config.backend.as_ref().map(|b| b.name().into_owned()),
            )
            .field("timeout", &config.timeout)
            .field("retry", &config.retry)
            .finish_non_exhaustive()
    }
}

/// Validates the incoming messages, prepends the snapshot's system prompt,
/// merges snapshot defaults into unset request fields and validates the
/// resulting parameters. Request-level values always win.
fn assemble_chat(
    snapshot: &ClientConfig,
    mut request: ChatRequest,
) -> Result<ChatRequest, LlmError> {
    validate_messages(&request.messages, snapshot.max_input_len)?;

    if !snapshot.system_prompt.is_empty() {
        request
            .messages
            .insert(0, Message::system(snapshot.system_prompt.clone()));
    }
    request.model = request.model.or_else(|| snapshot.model.clone());
    request.max_tokens = request.max_tokens.or(snapshot.max_tokens);
    request.temperature = request.temperature.or(snapshot.temperature);
    request.presence_penalty = request.presence_penalty.or(snapshot.presence_penalty);
    request.frequency_penalty = request.frequency_penalty.or(snapshot.frequency_penalty);
    if request.tools.is_empty() && !snapshot.tools.is_empty() {
        request.tools = snapshot.tools.to_vec();
    }

    validate_request(&request)?;
    Ok(request)
}
