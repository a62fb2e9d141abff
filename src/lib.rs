//! unillm — a thin, unified client for LLM text-generation backends.
//!
//! The crate normalizes request/response shapes across pluggable backends,
//! validates inputs before anything reaches the network, and makes unary
//! requests resilient through an exponential-backoff retry engine with
//! per-attempt timeouts. Backends implement the [`Backend`] trait; this
//! crate deliberately contains no HTTP transport of its own.
//!
//! Basic usage:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use unillm::{Client, Message};
//!
//! let client = Client::builder()
//!     .backend(Arc::new(my_backend))
//!     .model("claude-sonnet-4-20250514")
//!     .max_retries(2)
//!     .build()?;
//!
//! let response = client.chat(vec![Message::user("Hello, world!")]).await?;
//! println!("{}", response.content);
//! ```
//!
//! Configuration may change while requests are in flight: every call takes an
//! atomic snapshot of the client's settings up front and is insulated from
//! concurrent setter calls for its entire duration.

#![deny(unsafe_code)]

pub mod builder;
pub mod client;
pub mod error;
pub mod hooks;
pub mod names;
pub mod retry;
pub mod streaming;
pub mod traits;
pub mod types;
pub mod validation;

pub use builder::ClientBuilder;
pub use client::Client;
pub use error::LlmError;
pub use hooks::{Hook, HookEvent, HookKind};
pub use retry::RetryPolicy;
pub use streaming::{CancelHandle, ChatStream, ChatStreamHandle, StreamChunk};
pub use traits::{Backend, EmbeddingCapability, ModelListingCapability};
pub use types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, FinishReason, ImagePart,
    Message, MessageRole, ModelInfo, Tool, ToolCall, ToolResult, Usage,
};

/// Convenience re-exports for callers.
pub mod prelude {
    pub use crate::builder::ClientBuilder;
    pub use crate::client::Client;
    pub use crate::error::LlmError;
    pub use crate::streaming::{ChatStreamHandle, StreamChunk};
    pub use crate::traits::Backend;
    pub use crate::types::{ChatRequest, ChatResponse, Message, Tool};
}
