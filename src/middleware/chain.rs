//! Middleware contract and chain composition.

use super::context::ExecutionContext;
use super::error::CommandResult;
use std::fmt;
use std::sync::Arc;

/// Terminal handler stored in a composed chain.
pub type HandlerFn = dyn Fn(&mut ExecutionContext) -> CommandResult + Send + Sync;

/// A unit of cross-cutting behavior wrapped around a command handler.
///
/// An implementation either calls `next.run(ctx)` (possibly after changing
/// `ctx`) or returns without calling it, which short-circuits everything
/// further down the chain including the handler.
///
/// # Object Safety
///
/// This trait is object-safe; chains store `Arc<dyn Middleware>`.
pub trait Middleware: Send + Sync {
    /// Run this middleware around the rest of the chain.
    fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The rest of the chain, as seen by one middleware.
///
/// `Next` is `Copy`, so a middleware such as retry can run it more than
/// once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Fn(&mut ExecutionContext) -> CommandResult,
}

impl<'a> Next<'a> {
    /// Continue with the next middleware, or the handler once none remain.
    pub fn run(self, ctx: &mut ExecutionContext) -> CommandResult {
        match self.remaining.split_first() {
            Some((current, rest)) => current.handle(
                ctx,
                Next {
                    remaining: rest,
                    handler: self.handler,
                },
            ),
            None => (self.handler)(ctx),
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining.len())
            .finish()
    }
}

/// Middleware built from a closure.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut ExecutionContext, Next<'_>) -> CommandResult + Send + Sync,
{
    fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult {
        (self.f)(ctx, next)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a closure as a middleware.
///
/// # Example
///
/// ```
/// use clikit::middleware::{compose_middleware, from_fn, ExecutionContext};
/// use serde_json::json;
///
/// let tag = from_fn("tag", |ctx, next| {
///     ctx.set_scratch("tagged", true);
///     next.run(ctx)
/// });
/// let chain = compose_middleware(vec![tag], |ctx: &mut ExecutionContext| {
///     Ok(ctx.scratch("tagged").cloned().unwrap_or_default())
/// });
///
/// let mut ctx = ExecutionContext::for_command("demo");
/// assert_eq!(chain.call(&mut ctx).unwrap(), json!(true));
/// ```
pub fn from_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn Middleware>
where
    F: Fn(&mut ExecutionContext, Next<'_>) -> CommandResult + Send + Sync + 'static,
{
    Arc::new(FnMiddleware {
        name: name.into(),
        f,
    })
}

/// An ordered list of middleware not yet bound to a handler.
///
/// The first middleware added runs first (outermost).
#[derive(Clone, Default)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline from middleware in declaration order.
    pub fn from_middlewares(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middlewares }
    }

    /// Append a middleware. It runs inside every middleware added before it.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append an already shared middleware.
    pub fn with_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Run the pipeline around `handler` for one invocation.
    pub fn run(
        &self,
        ctx: &mut ExecutionContext,
        handler: &dyn Fn(&mut ExecutionContext) -> CommandResult,
    ) -> CommandResult {
        Next {
            remaining: &self.middlewares,
            handler,
        }
        .run(ctx)
    }

    /// Bind a terminal handler, producing a reusable chain.
    pub fn build<F>(self, handler: F) -> MiddlewareChain
    where
        F: Fn(&mut ExecutionContext) -> CommandResult + Send + Sync + 'static,
    {
        MiddlewareChain {
            pipeline: self,
            handler: Arc::new(handler),
        }
    }

    /// Number of middleware in the pipeline.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check whether the pipeline has no middleware.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Middleware names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("middlewares", &self.names())
            .finish()
    }
}

/// A pipeline bound to its terminal handler.
///
/// Built once and invoked once per command invocation, each time with a
/// fresh [`ExecutionContext`].
#[derive(Clone)]
pub struct MiddlewareChain {
    pipeline: Pipeline,
    handler: Arc<HandlerFn>,
}

impl MiddlewareChain {
    /// Start building a chain.
    pub fn builder() -> Pipeline {
        Pipeline::new()
    }

    /// Run the chain for one invocation.
    pub fn call(&self, ctx: &mut ExecutionContext) -> CommandResult {
        self.pipeline.run(ctx, &*self.handler)
    }

    /// The middleware part of the chain.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Compose middleware around a terminal handler.
///
/// `middlewares[0]` runs first; the handler runs after the last one calls
/// `next`. An empty list yields a chain that just calls the handler.
pub fn compose_middleware<F>(middlewares: Vec<Arc<dyn Middleware>>, handler: F) -> MiddlewareChain
where
    F: Fn(&mut ExecutionContext) -> CommandResult + Send + Sync + 'static,
{
    Pipeline::from_middlewares(middlewares).build(handler)
}
