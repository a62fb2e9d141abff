//! Chat message, request and response types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::tools::{Tool, ToolCall, ToolResult};

/// Message role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// An image attachment for vision-capable models.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImagePart {
    /// e.g. "image/jpeg", "image/png"
    pub mime_type: String,
    /// Raw image bytes. Backends are responsible for any transfer encoding.
    pub data: Vec<u8>,
}

/// A single message in a conversation.
///
/// A message is considered non-empty when it carries at least one of
/// {content, images, tool calls, tool results}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImagePart>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
}

impl Message {
    fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, content)
    }

    /// Creates a tool message carrying the result of a tool invocation.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: String::new(),
            images: Vec::new(),
            tool_calls: Vec::new(),
            tool_results: vec![ToolResult {
                tool_call_id: tool_call_id.into(),
                content: content.into(),
            }],
        }
    }

    /// Attaches an image to the message.
    pub fn with_image(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.images.push(ImagePart {
            mime_type: mime_type.into(),
            data,
        });
        self
    }

    /// Attaches a model-requested tool invocation to the message.
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Whether the message carries no content of any kind.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
            && self.images.is_empty()
            && self.tool_calls.is_empty()
            && self.tool_results.is_empty()
    }

    /// Contribution of this message to the aggregate input size.
    pub(crate) fn input_len(&self) -> usize {
        self.content.len()
            + self.images.iter().map(|i| i.data.len()).sum::<usize>()
            + self
                .tool_results
                .iter()
                .map(|r| r.content.len())
                .sum::<usize>()
    }
}

/// Parameters for one chat request.
///
/// `None` (or an empty list) means "use the client default, falling back to
/// the backend default". Request-level values always win over client-level
/// defaults during assembly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl ChatRequest {
    /// Creates a request with messages only; all parameters unset.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

/// A completed chat response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated text.
    pub content: String,
    /// Tool invocations requested by the model, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Backend that produced the response.
    pub backend: String,
    /// Model that produced the response.
    pub model: String,
    #[serde(default)]
    pub usage: Usage,
    /// Wall-clock latency of the successful attempt.
    #[serde(default)]
    pub latency: Duration,
    pub finish_reason: Option<FinishReason>,
}

impl ChatResponse {
    /// Whether the response carries neither text nor tool calls.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.tool_calls.is_empty()
    }
}
