//! Core data types shared by clients and backends.

mod chat;
mod embedding;
mod model;
mod tools;

pub use chat::{ChatRequest, ChatResponse, FinishReason, ImagePart, Message, MessageRole, Usage};
pub use embedding::{EmbeddingRequest, EmbeddingResponse};
pub use model::ModelInfo;
pub use tools::{Tool, ToolCall, ToolResult};
