//! Parameter validation middleware.

use super::chain::{Middleware, Next};
use super::context::ExecutionContext;
use super::error::{CommandError, CommandResult};
use super::schema::Schema;

/// Validates `ctx.params` against a schema before the rest of the chain runs.
///
/// On success the parameters are replaced with the schema's normalized
/// output and `next` is called. On failure a
/// [`CommandError::ValidationFailed`] is returned and nothing downstream,
/// handler included, is invoked.
pub struct ValidationMiddleware<S> {
    schema: S,
}

impl<S: Schema> ValidationMiddleware<S> {
    /// Validate against `schema`.
    pub fn new(schema: S) -> Self {
        Self { schema }
    }

    /// The schema in use.
    pub fn schema(&self) -> &S {
        &self.schema
    }
}

impl<S: Schema> Middleware for ValidationMiddleware<S> {
    fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult {
        match self.schema.validate(&ctx.params) {
            Ok(normalized) => {
                ctx.params = normalized;
                next.run(ctx)
            }
            Err(violations) => {
                tracing::debug!(
                    command = %ctx.command,
                    violations = violations.len(),
                    "parameters rejected"
                );
                Err(CommandError::validation(violations))
            }
        }
    }

    fn name(&self) -> &str {
        "validation"
    }
}
