//! Well-known backend identifiers.
//!
//! Backend adapters are free to use any name, but these constants keep
//! spelling consistent across adapters, hooks and logs.

pub const ANTHROPIC: &str = "anthropic";
pub const OPENAI: &str = "openai";
pub const DEEPSEEK: &str = "deepseek";
pub const GEMINI: &str = "gemini";
pub const GROQ: &str = "groq";
pub const GLM: &str = "glm";
pub const PERPLEXITY: &str = "perplexity";
/// Local/self-hosted servers (Ollama, vLLM, llama.cpp, ...).
pub const LOCAL: &str = "local";
