//! Routes commands to registered handlers.

use super::command::{Command, RawCommand};
use crate::middleware::{CommandError, CommandResult, ExecutionContext, Pipeline};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Handler registered for a command key.
pub type CommandHandler =
    Arc<dyn Fn(&dyn Command, &mut ExecutionContext) -> CommandResult + Send + Sync>;

/// Validates commands and routes them to their handlers.
///
/// One `dispatch` call processes exactly one command and returns exactly
/// one result. The handler runs inside the dispatcher's middleware
/// [`Pipeline`]. A panic raised by the handler is caught at the innermost
/// point of the pipeline and turned into [`CommandError::Panicked`], so
/// middleware (retry, logging) see it as an ordinary failure. Panics raised
/// by middleware are caught at the dispatcher boundary.
///
/// # Example
///
/// ```
/// use clikit::dispatch::{CommandDispatcher, RawCommand};
/// use clikit::middleware::{ExecutionContext, Params};
/// use serde_json::json;
///
/// let mut dispatcher = CommandDispatcher::new();
/// dispatcher
///     .register("ping", |_cmd, _ctx: &mut ExecutionContext| Ok(json!("pong")))
///     .unwrap();
///
/// let result = dispatcher.dispatch(&RawCommand::new("ping", Params::new()));
/// assert_eq!(result.unwrap(), json!("pong"));
/// ```
#[derive(Default)]
pub struct CommandDispatcher {
    handlers: HashMap<String, CommandHandler>,
    pipeline: Pipeline,
}

impl CommandDispatcher {
    /// Create a dispatcher with no handlers and no middleware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher whose handlers run inside `pipeline`.
    pub fn with_middleware(pipeline: Pipeline) -> Self {
        Self {
            handlers: HashMap::new(),
            pipeline,
        }
    }

    /// Register a handler. Registering the same key twice is an error.
    pub fn register<F>(&mut self, key: impl Into<String>, handler: F) -> Result<(), CommandError>
    where
        F: Fn(&dyn Command, &mut ExecutionContext) -> CommandResult + Send + Sync + 'static,
    {
        let key = key.into();
        if self.handlers.contains_key(&key) {
            return Err(CommandError::duplicate(key));
        }
        tracing::debug!(key = %key, "registered command handler");
        self.handlers.insert(key, Arc::new(handler));
        Ok(())
    }

    /// Register a handler that receives its parameters deserialized as `T`.
    ///
    /// Deserialization happens after middleware ran, so `T` sees the
    /// normalized parameters. A mismatch is a validation failure.
    pub fn register_typed<T, F>(
        &mut self,
        key: impl Into<String>,
        handler: F,
    ) -> Result<(), CommandError>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T, &mut ExecutionContext) -> CommandResult + Send + Sync + 'static,
    {
        self.register(key, move |_command: &dyn Command, ctx: &mut ExecutionContext| {
            let args = serde_json::from_value::<T>(Value::Object(ctx.params.clone()))
                .map_err(|e| CommandError::invalid(format!("invalid parameters: {}", e)))?;
            handler(args, ctx)
        })
    }

    /// Check whether a handler is registered for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn registered_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The middleware every handler runs in.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Dispatch one command with a fresh execution context.
    pub fn dispatch(&self, command: &dyn Command) -> CommandResult {
        let mut ctx = ExecutionContext::new(command.key(), command.params());
        self.dispatch_in(command, &mut ctx)
    }

    /// Decode a structured payload and dispatch it.
    ///
    /// Payloads without the shape of a command fail with
    /// [`CommandError::NotACommand`].
    pub fn dispatch_value(&self, payload: &Value) -> CommandResult {
        let command = RawCommand::from_value(payload).map_err(|e| {
            tracing::debug!(error = %e, "rejected payload");
            e
        })?;
        self.dispatch(&command)
    }

    /// Dispatch one command using a caller-supplied context.
    ///
    /// The caller can inspect the context afterwards (timings, retry
    /// attempts, scratch data). The context must not be reused for another
    /// invocation.
    pub fn dispatch_in(&self, command: &dyn Command, ctx: &mut ExecutionContext) -> CommandResult {
        let key = command.key();

        match command.validate() {
            Ok(true) => {}
            Ok(false) => {
                return Err(CommandError::invalid(format!(
                    "command '{}' rejected its own data",
                    key
                )))
            }
            Err(e) => return Err(e),
        }

        let handler = self
            .handlers
            .get(key)
            .map(Arc::as_ref)
            .ok_or_else(|| CommandError::not_found(key))?;

        tracing::debug!(key = %key, invocation_id = %ctx.invocation_id, "dispatching command");

        // A handler panic becomes a failure before any middleware sees it.
        let terminal = |ctx: &mut ExecutionContext| {
            panic::catch_unwind(AssertUnwindSafe(|| handler(command, ctx)))
                .unwrap_or_else(|payload| Err(panicked(key, "command handler", payload)))
        };
        panic::catch_unwind(AssertUnwindSafe(|| self.pipeline.run(ctx, &terminal)))
            .unwrap_or_else(|payload| Err(panicked(key, "middleware", payload)))
    }
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("handlers", &self.registered_keys())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

fn panicked(key: &str, origin: &str, payload: Box<dyn Any + Send>) -> CommandError {
    let message = panic_message(payload.as_ref());
    tracing::error!(key = %key, origin = origin, panic = %message, "panic caught during dispatch");
    CommandError::Panicked { message }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
