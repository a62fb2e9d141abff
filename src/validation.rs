//! Input and parameter validation.
//!
//! Everything here runs before the first network attempt: a request that
//! fails validation never reaches a (paid) backend call, and validation
//! errors are always terminal.

use std::time::Duration;

use crate::error::LlmError;
use crate::types::{ChatRequest, Message, Tool};

/// Maximum allowed length for model names.
pub const MAX_MODEL_NAME_LEN: usize = 256;
/// Maximum allowed length for tool names.
pub const MAX_TOOL_NAME_LEN: usize = 64;
/// Maximum allowed length for one stop sequence.
pub const MAX_STOP_SEQUENCE_LEN: usize = 128;
/// Maximum number of stop sequences.
pub const MAX_STOP_SEQUENCES: usize = 16;
/// Upper bound for `max_tokens`, to catch misuse.
pub const MAX_MAX_TOKENS: u32 = 1_000_000;

/// Sampling bounds (OpenAI convention).
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MIN_TOP_P: f64 = 0.0;
pub const MAX_TOP_P: f64 = 1.0;
pub const MIN_PENALTY: f64 = -2.0;
pub const MAX_PENALTY: f64 = 2.0;

/// Maximum number of retries a client may be configured with.
pub const MAX_RETRIES: u32 = 10;
/// Minimum backoff base delay.
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);
/// Upper bound for the backoff delay cap.
pub const MAX_RETRY_MAX_DELAY: Duration = Duration::from_secs(300);

/// Allowed image MIME types for vision input.
const ALLOWED_IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Checks message non-emptiness and the aggregate input size limit.
///
/// Aggregate size is the sum of text content, image payload bytes and
/// tool-result content across all messages. Input exactly at the limit is
/// accepted.
pub fn validate_messages(messages: &[Message], max_input_len: usize) -> Result<(), LlmError> {
    if messages.iter().all(Message::is_empty) {
        return Err(LlmError::EmptyInput);
    }
    let total: usize = messages.iter().map(Message::input_len).sum();
    if total > max_input_len {
        return Err(LlmError::InputTooLong {
            len: total,
            max: max_input_len,
        });
    }
    Ok(())
}

/// Checks request parameters against their closed ranges.
pub fn validate_request(request: &ChatRequest) -> Result<(), LlmError> {
    if let Some(model) = &request.model {
        check_model_name(model)?;
    }
    if let Some(t) = request.temperature {
        check_temperature(t)?;
    }
    if let Some(p) = request.top_p {
        check_top_p(p)?;
    }
    if let Some(p) = request.presence_penalty {
        check_penalty("presence_penalty", p)?;
    }
    if let Some(p) = request.frequency_penalty {
        check_penalty("frequency_penalty", p)?;
    }
    if let Some(n) = request.max_tokens {
        check_max_tokens(n)?;
    }
    check_stop_sequences(&request.stop)?;
    check_tools(&request.tools)?;
    check_images(&request.messages)?;
    Ok(())
}

pub(crate) fn check_model_name(model: &str) -> Result<(), LlmError> {
    if model.len() > MAX_MODEL_NAME_LEN {
        return Err(LlmError::InvalidInput(format!(
            "model name exceeds maximum length of {MAX_MODEL_NAME_LEN}"
        )));
    }
    Ok(())
}

pub(crate) fn check_temperature(t: f64) -> Result<(), LlmError> {
    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) {
        return Err(LlmError::InvalidInput(format!(
            "temperature must be between {MIN_TEMPERATURE} and {MAX_TEMPERATURE}"
        )));
    }
    Ok(())
}

pub(crate) fn check_top_p(p: f64) -> Result<(), LlmError> {
    if !(MIN_TOP_P..=MAX_TOP_P).contains(&p) {
        return Err(LlmError::InvalidInput(format!(
            "top_p must be between {MIN_TOP_P} and {MAX_TOP_P}"
        )));
    }
    Ok(())
}

pub(crate) fn check_penalty(name: &str, p: f64) -> Result<(), LlmError> {
    if !(MIN_PENALTY..=MAX_PENALTY).contains(&p) {
        return Err(LlmError::InvalidInput(format!(
            "{name} must be between {MIN_PENALTY} and {MAX_PENALTY}"
        )));
    }
    Ok(())
}

pub(crate) fn check_max_tokens(n: u32) -> Result<(), LlmError> {
    if n > MAX_MAX_TOKENS {
        return Err(LlmError::InvalidInput(format!(
            "max_tokens exceeds maximum of {MAX_MAX_TOKENS}"
        )));
    }
    Ok(())
}

fn check_stop_sequences(stop: &[String]) -> Result<(), LlmError> {
    if stop.len() > MAX_STOP_SEQUENCES {
        return Err(LlmError::InvalidInput(format!(
            "too many stop sequences (max {MAX_STOP_SEQUENCES})"
        )));
    }
    for (i, s) in stop.iter().enumerate() {
        if s.len() > MAX_STOP_SEQUENCE_LEN {
            return Err(LlmError::InvalidInput(format!(
                "stop sequence {i} exceeds maximum length of {MAX_STOP_SEQUENCE_LEN}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn check_tools(tools: &[Tool]) -> Result<(), LlmError> {
    for (i, tool) in tools.iter().enumerate() {
        if tool.name.is_empty() {
            return Err(LlmError::InvalidInput(format!("tool {i} has empty name")));
        }
        if tool.name.len() > MAX_TOOL_NAME_LEN {
            return Err(LlmError::InvalidInput(format!(
                "tool {i} name exceeds maximum length of {MAX_TOOL_NAME_LEN}"
            )));
        }
    }
    Ok(())
}

fn check_images(messages: &[Message]) -> Result<(), LlmError> {
    for msg in messages {
        for (i, img) in msg.images.iter().enumerate() {
            if img.mime_type.is_empty() {
                return Err(LlmError::InvalidInput(format!("image {i} has empty MIME type")));
            }
            let lower = img.mime_type.to_lowercase();
            if !ALLOWED_IMAGE_MIME_TYPES.contains(&lower.as_str()) {
                return Err(LlmError::InvalidInput(format!(
                    "image {i} has unsupported MIME type: {} (allowed: jpeg, png, gif, webp)",
                    img.mime_type
                )));
            }
            if img.data.is_empty() {
                return Err(LlmError::InvalidInput(format!("image {i} has empty data")));
            }
        }
    }
    Ok(())
}
