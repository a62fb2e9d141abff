//! Request lifecycle observation.
//!
//! A hook is a synchronous callback invoked on the calling task at each
//! lifecycle point of a request. Hooks receive sanitized error strings only;
//! see [`LlmError::sanitized_message`](crate::error::LlmError::sanitized_message).
//!
//! Events for one call always arrive in the order: `RequestStarted`, zero or
//! more `Retried`, then exactly one of `Succeeded` / `Failed`. The hook may
//! be called concurrently from multiple in-flight requests and must be
//! thread-safe on its own.

use std::sync::Arc;
use std::time::Duration;

use crate::types::Usage;

/// Lifecycle points observable through a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Emitted once, before the first attempt.
    RequestStarted,
    /// Emitted before each backoff sleep that precedes another attempt.
    Retried,
    /// Emitted after a successful attempt; the call is finished.
    Succeeded,
    /// Emitted after a terminal failure; the call is finished.
    Failed,
}

/// One lifecycle event.
#[derive(Debug, Clone)]
pub struct HookEvent {
    pub kind: HookKind,
    pub backend: String,
    pub model: String,
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// Attempt latency; set on `Succeeded` and `Failed`.
    pub latency: Option<Duration>,
    /// Backoff delay about to be slept; set on `Retried`.
    pub delay: Option<Duration>,
    /// Sanitized error message; set on `Retried` and `Failed`.
    pub error: Option<String>,
    /// Token counts; set on `Succeeded` when the result carries usage.
    pub usage: Option<Usage>,
}

/// The hook callback type.
pub type Hook = Arc<dyn Fn(&HookEvent) + Send + Sync>;
