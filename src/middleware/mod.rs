//! Middleware chains around command handlers.
//!
//! A chain is an ordered list of [`Middleware`] wrapped around a terminal
//! handler. The first middleware in the list runs first and decides whether
//! (and how often) the rest of the chain runs by calling [`Next::run`].
//!
//! ```text
//!   ctx ──▶ LoggingMiddleware ──▶ ValidationMiddleware ──▶ RetryMiddleware ──▶ handler
//!            (times everything)    (may short-circuit)       (may re-run)
//! ```
//!
//! # Example
//!
//! ```
//! use clikit::middleware::{
//!     ExecutionContext, FieldSpec, FieldType, LoggingMiddleware, MiddlewareChain,
//!     ParamSchema, RetryMiddleware, ValidationMiddleware,
//! };
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let schema = ParamSchema::new().field(FieldSpec::new("name", FieldType::String).required());
//!
//! let chain = MiddlewareChain::builder()
//!     .with(LoggingMiddleware::new())
//!     .with(ValidationMiddleware::new(schema))
//!     .with(RetryMiddleware::new(3, Duration::from_millis(100)))
//!     .build(|ctx: &mut ExecutionContext| Ok(json!({ "hello": ctx.params["name"] })));
//!
//! let mut ctx = ExecutionContext::for_command("greet").with_param("name", "world");
//! assert_eq!(chain.call(&mut ctx).unwrap(), json!({ "hello": "world" }));
//! ```

mod chain;
mod context;
mod error;
mod logging;
mod retry;
mod schema;
mod validation;

pub use chain::{compose_middleware, from_fn, FnMiddleware, HandlerFn, Middleware, MiddlewareChain, Next, Pipeline};
pub use context::{ExecutionContext, Params};
pub use error::{CommandError, CommandResult, Violation};
pub use logging::LoggingMiddleware;
pub use retry::{RetryMiddleware, RETRY_ATTEMPTS_KEY};
pub use schema::{FieldSpec, FieldType, FnSchema, ParamSchema, Schema};
pub use validation::ValidationMiddleware;
