//! Model listing types.

use serde::{Deserialize, Serialize};

/// An available model, as reported by a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    /// Model identifier (e.g. "claude-sonnet-4-20250514").
    pub id: String,
    /// Human-readable name, when the backend provides one.
    #[serde(default)]
    pub name: String,
    /// Backend that serves the model.
    #[serde(default)]
    pub backend: String,
}
