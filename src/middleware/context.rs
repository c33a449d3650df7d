//! Per-invocation state threaded through a middleware chain.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

/// Parameters of a command invocation.
pub type Params = Map<String, Value>;

/// Mutable state for exactly one command invocation.
///
/// A context is created for an invocation, handed by `&mut` through every
/// middleware and the terminal handler, and dropped when the chain returns.
/// It is never shared between invocations.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Unique id of this invocation, used to correlate log entries.
    pub invocation_id: String,
    /// Key of the command being run.
    pub command: String,
    /// Command parameters. Validation middleware replaces them with the normalized form.
    pub params: Params,
    /// Free-form per-invocation data shared between middleware and handler.
    pub scratch: Map<String, Value>,
    /// Wall-clock start, set by `LoggingMiddleware`.
    pub started_at: Option<DateTime<Utc>>,
    /// Duration of the wrapped chain, set by `LoggingMiddleware`.
    pub elapsed: Option<Duration>,
}

impl ExecutionContext {
    /// Create a context for `command` with the given parameters.
    pub fn new(command: impl Into<String>, params: Params) -> Self {
        Self {
            invocation_id: Uuid::new_v4().to_string(),
            command: command.into(),
            params,
            scratch: Map::new(),
            started_at: None,
            elapsed: None,
        }
    }

    /// Create a context with no parameters.
    pub fn for_command(command: impl Into<String>) -> Self {
        Self::new(command, Params::new())
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Get a parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Store a value in scratch space.
    pub fn set_scratch(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.scratch.insert(key.into(), value.into());
    }

    /// Read a value from scratch space.
    pub fn scratch(&self, key: &str) -> Option<&Value> {
        self.scratch.get(key)
    }
}
