//! Error handling for unillm.
//!
//! All failures surface as a single closed [`LlmError`] enum. Classification
//! into retryable and terminal kinds is an exhaustive match in
//! [`LlmError::is_retryable`], so the retry engine never guesses from error
//! text or identity.

use thiserror::Error;

/// The error type returned by every fallible operation in this crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// No backend has been configured on the client.
    #[error("no backend configured")]
    NoBackend,

    /// The message set carries no content at all.
    #[error("empty input")]
    EmptyInput,

    /// Aggregate input size exceeds the configured maximum.
    #[error("input length {len} exceeds maximum {max}")]
    InputTooLong { len: usize, max: usize },

    /// A request parameter is out of range or otherwise malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A client configuration option violates its documented bounds.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backend reported a rate limit. Retryable.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The per-attempt deadline elapsed before the backend answered. Retryable.
    #[error("request timed out")]
    Timeout,

    /// The backend returned a syntactically valid but content-free result. Retryable.
    #[error("backend returned an empty response")]
    EmptyResponse,

    /// The request was canceled by the caller. Terminal and immediate.
    #[error("request canceled")]
    Canceled,

    /// The configured backend does not implement the requested capability.
    #[error("backend does not support {0}")]
    UnsupportedCapability(&'static str),

    /// Any other backend failure. Terminal by default so that permanent
    /// failures (auth, bad request) are never masked as transient.
    #[error("backend {backend} error: {message}")]
    Backend { backend: String, message: String },
}

impl LlmError {
    /// Construct a generic backend error.
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Whether the retry engine may attempt this operation again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Timeout | Self::EmptyResponse => true,
            Self::NoBackend
            | Self::EmptyInput
            | Self::InputTooLong { .. }
            | Self::InvalidInput(_)
            | Self::InvalidConfig(_)
            | Self::Canceled
            | Self::UnsupportedCapability(_)
            | Self::Backend { .. } => false,
        }
    }

    /// A display string safe to hand to log sinks and hooks.
    ///
    /// Backend error messages may echo request URLs or headers that contain
    /// key material. Anything that looks like a credential collapses to a
    /// fixed notice; structured variants pass through unchanged.
    pub fn sanitized_message(&self) -> String {
        let msg = self.to_string();
        if contains_sensitive(&msg) {
            "backend error (details redacted)".to_string()
        } else {
            msg
        }
    }
}

/// Checks whether an error message might contain API keys or tokens.
pub(crate) fn contains_sensitive(msg: &str) -> bool {
    const PATTERNS: &[&str] = &[
        "sk-",            // OpenAI / Anthropic key prefixes
        "api_key",        // generic
        "apikey",         // generic
        "bearer ",        // auth header
        "token=",         // token in URL
        "key=",           // key in URL
        "authorization:", // auth header
    ];
    let lower = msg.to_lowercase();
    PATTERNS.iter().any(|p| lower.contains(p))
}
