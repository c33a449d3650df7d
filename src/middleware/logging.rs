//! Timing and logging middleware.

use super::chain::{Middleware, Next};
use super::context::ExecutionContext;
use super::error::CommandResult;
use crate::observability::InvocationLog;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Records start time and duration of everything it wraps.
///
/// Always calls `next` exactly once and returns its result unchanged.
/// The start time and duration are stored on the context
/// (`started_at`, `elapsed`) and reported through `tracing`; when an
/// [`InvocationLog`] is attached, they are written there as well. A failure
/// to write the log is reported as a warning and never changes the result.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    log: Option<Arc<InvocationLog>>,
}

impl LoggingMiddleware {
    /// Log through `tracing` only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write every invocation to a markdown log.
    pub fn with_log(log: Arc<InvocationLog>) -> Self {
        Self { log: Some(log) }
    }
}

impl Middleware for LoggingMiddleware {
    fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        ctx.started_at = Some(started_at);

        tracing::debug!(
            invocation_id = %ctx.invocation_id,
            command = %ctx.command,
            "invocation started"
        );
        if let Some(log) = &self.log {
            if let Err(e) =
                log.log_invocation_start(&ctx.invocation_id, &ctx.command, &ctx.params, started_at)
            {
                tracing::warn!(error = %e, "failed to write invocation log");
            }
        }

        let result = next.run(ctx);

        let elapsed = clock.elapsed();
        ctx.elapsed = Some(elapsed);

        match &result {
            Ok(_) => tracing::info!(
                invocation_id = %ctx.invocation_id,
                command = %ctx.command,
                elapsed_ms = elapsed.as_millis() as u64,
                "invocation succeeded"
            ),
            Err(e) => tracing::warn!(
                invocation_id = %ctx.invocation_id,
                command = %ctx.command,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "invocation failed"
            ),
        }

        if let Some(log) = &self.log {
            let error_message;
            let outcome = match &result {
                Ok(output) => Ok(output),
                Err(e) => {
                    error_message = e.to_string();
                    Err(error_message.as_str())
                }
            };
            if let Err(e) =
                log.log_invocation_result(&ctx.invocation_id, &ctx.command, elapsed, outcome)
            {
                tracing::warn!(error = %e, "failed to write invocation log");
            }
        }

        result
    }

    fn name(&self) -> &str {
        "logging"
    }
}
