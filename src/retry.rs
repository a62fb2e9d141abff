//! Retry policy and the attempt loop shared by unary operations.
//!
//! Attempts are numbered from 1; a policy with `max_retries = 0` means
//! exactly one attempt and no backoff logic at all. Each attempt runs under
//! its own deadline derived from the snapshot timeout; an elapsed deadline is
//! a retryable [`LlmError::Timeout`], while [`LlmError::Canceled`] from the
//! operation aborts the loop immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, sleep, timeout};
use tracing::{error, info, warn};

use crate::error::LlmError;
use crate::hooks::{Hook, HookEvent, HookKind};
use crate::types::{ChatResponse, EmbeddingResponse, Usage};

/// Maximum unilateral jitter, as a fraction of the capped delay.
const JITTER_FACTOR: f64 = 0.25;

/// Cap on the backoff exponent so the shift below cannot overflow.
const MAX_BACKOFF_EXP: u32 = 20;

/// Exponential backoff configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt, bounded to [0, 10] by the builder.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied to the exponential delay, before jitter.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// The capped exponential delay after `prior_failures` failed attempts
    /// (numbered from 1), without jitter.
    pub(crate) fn capped_delay(&self, prior_failures: u32) -> Duration {
        let exp = prior_failures.saturating_sub(1).min(MAX_BACKOFF_EXP);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// The delay to sleep before the next attempt: capped exponential plus
    /// uniform jitter in [0%, 25%]. Jitter is additive only, preserving the
    /// original deployment behavior.
    pub(crate) fn delay_for(&self, prior_failures: u32) -> Duration {
        let capped = self.capped_delay(prior_failures);
        let jitter = capped.mul_f64(rand::thread_rng().gen_range(0.0..=JITTER_FACTOR));
        capped.saturating_add(jitter)
    }
}

/// Everything the attempt loop needs from a configuration snapshot.
pub(crate) struct RetryContext<'a> {
    pub backend: &'a str,
    pub model: &'a str,
    pub timeout: Duration,
    pub policy: RetryPolicy,
    pub hook: Option<&'a Hook>,
}

/// Results that can enrich a success hook event with token counts.
pub(crate) trait HasUsage {
    fn usage(&self) -> Option<Usage> {
        None
    }
}

impl HasUsage for ChatResponse {
    fn usage(&self) -> Option<Usage> {
        Some(self.usage)
    }
}

impl HasUsage for EmbeddingResponse {
    fn usage(&self) -> Option<Usage> {
        Some(self.usage)
    }
}

impl RetryContext<'_> {
    fn event(&self, kind: HookKind, attempt: u32) -> HookEvent {
        HookEvent {
            kind,
            backend: self.backend.to_string(),
            model: self.model.to_string(),
            attempt,
            latency: None,
            delay: None,
            error: None,
            usage: None,
        }
    }

    fn emit(&self, event: HookEvent) {
        if let Some(hook) = self.hook {
            hook(&event);
        }
    }
}

/// Drives the attempt loop for one operation.
///
/// Hook/log events are emitted in order: started, zero or more retried, then
/// exactly one of succeeded / failed. The terminal error is returned to the
/// caller verbatim.
pub(crate) async fn run_with_retry<T, F, Fut>(
    cx: RetryContext<'_>,
    op_name: &'static str,
    op: F,
) -> Result<T, LlmError>
where
    T: HasUsage,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = cx.policy.max_retries + 1;

    cx.emit(cx.event(HookKind::RequestStarted, 1));

    let mut last_err: Option<LlmError> = None;
    let mut attempt = 0u32;
    loop {
        attempt += 1;

        if attempt > 1 {
            let prev = last_err
                .as_ref()
                .map(LlmError::sanitized_message)
                .unwrap_or_default();
            let delay = cx.policy.delay_for(attempt - 1);
            warn!(
                backend = cx.backend,
                model = cx.model,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %prev,
                "retrying {op_name} request"
            );
            let mut event = cx.event(HookKind::Retried, attempt);
            event.delay = Some(delay);
            event.error = Some(prev);
            cx.emit(event);
            sleep(delay).await;
        }

        let start = Instant::now();
        let result = match timeout(cx.timeout, op()).await {
            Ok(res) => res,
            Err(_) => Err(LlmError::Timeout),
        };
        let latency = start.elapsed();

        match result {
            Ok(value) => {
                info!(
                    backend = cx.backend,
                    model = cx.model,
                    latency_ms = latency.as_millis() as u64,
                    attempt,
                    "{op_name} request succeeded"
                );
                let mut event = cx.event(HookKind::Succeeded, attempt);
                event.latency = Some(latency);
                event.usage = value.usage();
                cx.emit(event);
                return Ok(value);
            }
            Err(err) => {
                if !err.is_retryable() || attempt >= max_attempts {
                    error!(
                        backend = cx.backend,
                        model = cx.model,
                        error = %err.sanitized_message(),
                        attempt,
                        "{op_name} request failed"
                    );
                    let mut event = cx.event(HookKind::Failed, attempt);
                    event.latency = Some(latency);
                    event.error = Some(err.sanitized_message());
                    cx.emit(event);
                    return Err(err);
                }
                last_err = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn context(policy: RetryPolicy) -> RetryContext<'static> {
        RetryContext {
            backend: "test",
            model: "test-model",
            timeout: Duration::from_secs(5),
            policy,
            hook: None,
        }
    }

    impl HasUsage for &'static str {}

    #[tokio::test]
    async fn success_on_first_attempt_makes_one_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result = run_with_retry(context(RetryPolicy::default()), "chat", || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retryable_failure_then_success() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result = run_with_retry(context(policy), "chat", || {
            let calls = calls_clone.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(LlmError::RateLimited("429".into()))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_error_is_not_retried() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<&'static str, _> = run_with_retry(context(policy), "chat", || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::Canceled)
            }
        })
        .await;
        assert_eq!(result, Err(LlmError::Canceled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempt_budget_exhaustion_returns_last_error() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<&'static str, _> = run_with_retry(context(policy), "chat", || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::RateLimited("429".into()))
            }
        })
        .await;
        assert_eq!(result, Err(LlmError::RateLimited("429".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_operation_times_out_and_retries() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let mut cx = context(policy);
        cx.timeout = Duration::from_millis(10);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<&'static str, _> = run_with_retry(cx, "chat", || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(60)).await;
                Ok("never")
            }
        })
        .await;
        assert_eq!(result, Err(LlmError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn capped_delay_doubles_until_the_cap() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.capped_delay(1), Duration::from_millis(100));
        assert_eq!(policy.capped_delay(2), Duration::from_millis(200));
        assert_eq!(policy.capped_delay(3), Duration::from_millis(350));
        assert_eq!(policy.capped_delay(4), Duration::from_millis(350));
    }

    proptest! {
        #[test]
        fn jittered_delay_stays_within_a_quarter_above_cap(
            base_ms in 1u64..1_000,
            max_ms in 1u64..10_000,
            prior in 1u32..12,
        ) {
            let policy = RetryPolicy {
                max_retries: 10,
                base_delay: Duration::from_millis(base_ms),
                max_delay: Duration::from_millis(max_ms),
            };
            let capped = policy.capped_delay(prior);
            let delay = policy.delay_for(prior);
            prop_assert!(delay >= capped);
            prop_assert!(delay <= capped + capped.mul_f64(JITTER_FACTOR));
        }
    }
}
