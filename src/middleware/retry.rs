//! Retry middleware with linear backoff.

use super::chain::{Middleware, Next};
use super::context::ExecutionContext;
use super::error::{CommandError, CommandResult};
#[cfg(feature = "config")]
use crate::config::RetrySettings;
use std::sync::Arc;
use std::time::Duration;

/// Scratch key holding the number of attempts made.
pub const RETRY_ATTEMPTS_KEY: &str = "retry.attempts";

type RetryPredicate = dyn Fn(&CommandError) -> bool + Send + Sync;

/// Runs the rest of the chain again when it fails.
///
/// `max_retries` is the total number of attempts. Between attempt `k` and
/// `k + 1` (counting from 0) the calling thread sleeps for
/// `base_delay * (k + 1)`. When every attempt fails, the last failure is
/// returned as is. The number of attempts made is written to
/// `ctx.scratch["retry.attempts"]`.
///
/// Every failure is retried by default. Pass
/// [`CommandError::is_retryable`] to [`RetryMiddleware::retry_if`] to
/// return validation and routing failures immediately instead.
#[derive(Clone)]
pub struct RetryMiddleware {
    max_retries: u32,
    base_delay: Duration,
    retry_if: Arc<RetryPredicate>,
}

impl RetryMiddleware {
    /// Retry up to `max_retries` total attempts. A value of 0 still makes one attempt.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
            retry_if: Arc::new(|_: &CommandError| true),
        }
    }

    /// Build from resolved retry settings.
    #[cfg(feature = "config")]
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.max_retries, settings.base_delay())
    }

    /// Decide which failures are worth another attempt.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CommandError) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Arc::new(predicate);
        self
    }

    /// Total attempts allowed.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay slept after the failed attempt `attempt` (0-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }
}

impl std::fmt::Debug for RetryMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryMiddleware")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

impl Middleware for RetryMiddleware {
    fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult {
        let mut attempt = 0;
        loop {
            ctx.set_scratch(RETRY_ATTEMPTS_KEY, attempt + 1);
            let result = next.run(ctx);

            let error = match result {
                Ok(output) => return Ok(output),
                Err(error) => error,
            };

            if attempt + 1 >= self.max_retries || !(self.retry_if)(&error) {
                if attempt > 0 {
                    tracing::warn!(
                        command = %ctx.command,
                        attempts = attempt + 1,
                        error = %error,
                        "giving up after retries"
                    );
                }
                return Err(error);
            }

            let delay = self.delay_after(attempt);
            tracing::warn!(
                command = %ctx.command,
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );
            std::thread::sleep(delay);
            attempt += 1;
        }
    }

    fn name(&self) -> &str {
        "retry"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::compose_middleware;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl Fn(&mut ExecutionContext) -> CommandResult {
        move |_ctx: &mut ExecutionContext| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                Err(CommandError::execution(format!("failure {}", n)))
            } else {
                Ok(json!({ "call": n }))
            }
        }
    }

    #[test]
    fn test_success_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let chain = compose_middleware(
            vec![Arc::new(RetryMiddleware::new(3, Duration::from_millis(1)))],
            flaky(2, calls.clone()),
        );

        let mut ctx = ExecutionContext::for_command("sync");
        assert_eq!(chain.call(&mut ctx), Ok(json!({ "call": 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(ctx.scratch(RETRY_ATTEMPTS_KEY), Some(&json!(3)));
    }

    #[test]
    fn test_exhaustion_returns_last_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let chain = compose_middleware(
            vec![Arc::new(RetryMiddleware::new(3, Duration::from_millis(1)))],
            flaky(u32::MAX, calls.clone()),
        );

        let mut ctx = ExecutionContext::for_command("sync");
        assert_eq!(
            chain.call(&mut ctx),
            Err(CommandError::execution("failure 3"))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_linear_backoff() {
        let retry = RetryMiddleware::new(4, Duration::from_millis(10));
        assert_eq!(retry.delay_after(0), Duration::from_millis(10));
        assert_eq!(retry.delay_after(1), Duration::from_millis(20));
        assert_eq!(retry.delay_after(2), Duration::from_millis(30));

        let calls = Arc::new(AtomicU32::new(0));
        let chain = compose_middleware(vec![Arc::new(retry)], flaky(u32::MAX, calls));
        let started = Instant::now();
        let _ = chain.call(&mut ExecutionContext::for_command("sync"));
        // 10 + 20 + 30 ms between four attempts
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_zero_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let chain = compose_middleware(
            vec![Arc::new(RetryMiddleware::new(0, Duration::from_millis(1)))],
            flaky(u32::MAX, calls.clone()),
        );
        assert!(chain.call(&mut ExecutionContext::for_command("x")).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_failure_kind_is_retried_by_default() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let chain = compose_middleware(
            vec![Arc::new(RetryMiddleware::new(3, Duration::from_millis(1)))],
            move |_ctx: &mut ExecutionContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CommandError::invalid("downstream rejected"))
            },
        );
        assert_eq!(
            chain.call(&mut ExecutionContext::for_command("x")),
            Err(CommandError::invalid("downstream rejected"))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retryable_predicate_skips_deterministic_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let retry =
            RetryMiddleware::new(5, Duration::from_millis(1)).retry_if(CommandError::is_retryable);
        let chain = compose_middleware(vec![Arc::new(retry)], move |_ctx: &mut ExecutionContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CommandError::not_found("gone"))
        });
        let _ = chain.call(&mut ExecutionContext::for_command("x"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_settings() {
        let retry = RetryMiddleware::from_settings(&RetrySettings {
            max_retries: 4,
            base_delay_ms: 250,
        });
        assert_eq!(retry.max_retries(), 4);
        assert_eq!(retry.delay_after(1), Duration::from_millis(500));
    }
}
