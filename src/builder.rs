//! Validated client construction.
//!
//! All recognized options live here; bounds are checked once at
//! [`ClientBuilder::build`], which fails with a descriptive
//! [`LlmError::InvalidConfig`] instead of panicking later in a setter.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{Client, ClientConfig};
use crate::error::LlmError;
use crate::hooks::{Hook, HookEvent};
use crate::traits::Backend;
use crate::types::Tool;
use crate::validation::{
    MAX_RETRIES, MAX_RETRY_MAX_DELAY, MIN_RETRY_DELAY, check_max_tokens, check_model_name,
    check_penalty, check_temperature, check_tools,
};

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    /// Sets the per-attempt request timeout (default 60s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the maximum aggregate input length in bytes (default 100_000).
    pub fn max_input_len(mut self, len: usize) -> Self {
        self.config.max_input_len = len;
        self
    }

    /// Sets a system prompt prepended to every request.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Sets the default model, overriding the backend default.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    /// Sets the default max output tokens.
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    /// Sets the default sampling temperature.
    pub fn temperature(mut self, t: f64) -> Self {
        self.config.temperature = Some(t);
        self
    }

    /// Sets the default presence penalty.
    pub fn presence_penalty(mut self, p: f64) -> Self {
        self.config.presence_penalty = Some(p);
        self
    }

    /// Sets the default frequency penalty.
    pub fn frequency_penalty(mut self, p: f64) -> Self {
        self.config.frequency_penalty = Some(p);
        self
    }

    /// Sets the default embedding model.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = Some(model.into());
        self
    }

    /// Sets the default tool list.
    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.config.tools = tools.into();
        self
    }

    /// Sets how many times a retryable failure is retried (default 0,
    /// maximum 10).
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.retry.max_retries = n;
        self
    }

    /// Sets the backoff base delay (default 500ms, minimum 1ms).
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry.base_delay = delay;
        self
    }

    /// Sets the backoff delay cap (default 30s, maximum 5min).
    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.config.retry.max_delay = delay;
        self
    }

    /// Registers a synchronous lifecycle hook.
    pub fn hook(mut self, hook: impl Fn(&HookEvent) + Send + Sync + 'static) -> Self {
        self.config.hook = Some(Arc::new(hook) as Hook);
        self
    }

    /// Validates every option and constructs the client.
    pub fn build(self) -> Result<Client, LlmError> {
        let config = self.config;

        if config.timeout.is_zero() {
            return Err(LlmError::InvalidConfig("timeout must be positive".into()));
        }
        if config.retry.max_retries > MAX_RETRIES {
            return Err(LlmError::InvalidConfig(format!(
                "max_retries must be at most {MAX_RETRIES}"
            )));
        }
        if config.retry.base_delay < MIN_RETRY_DELAY {
            return Err(LlmError::InvalidConfig(format!(
                "retry base delay must be at least {MIN_RETRY_DELAY:?}"
            )));
        }
        if config.retry.max_delay > MAX_RETRY_MAX_DELAY {
            return Err(LlmError::InvalidConfig(format!(
                "retry max delay must be at most {MAX_RETRY_MAX_DELAY:?}"
            )));
        }
        if config.retry.max_delay < config.retry.base_delay {
            return Err(LlmError::InvalidConfig(
                "retry max delay must not be below the base delay".into(),
            ));
        }

        // Defaults obey the same closed ranges as per-request parameters.
        let invalid = |e: LlmError| LlmError::InvalidConfig(e.to_string());
        if let Some(model) = &config.model {
            check_model_name(model).map_err(invalid)?;
        }
        if let Some(t) = config.temperature {
            check_temperature(t).map_err(invalid)?;
        }
        if let Some(p) = config.presence_penalty {
            check_penalty("presence_penalty", p).map_err(invalid)?;
        }
        if let Some(p) = config.frequency_penalty {
            check_penalty("frequency_penalty", p).map_err(invalid)?;
        }
        if let Some(n) = config.max_tokens {
            check_max_tokens(n).map_err(invalid)?;
        }
        check_tools(&config.tools).map_err(invalid)?;

        Ok(Client::from_config(config))
    }
}
