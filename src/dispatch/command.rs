//! The command capability and the untyped command decoded from payloads.

use crate::middleware::{CommandError, Params};
use serde_json::Value;

/// Anything the dispatcher can route.
///
/// The only capability a command must provide is `validate`; the key
/// selects the handler and `params` seeds the execution context.
pub trait Command {
    /// Key of the handler this command is routed to.
    fn key(&self) -> &str;

    /// Check the command's own data.
    ///
    /// `Ok(false)` and `Err(_)` both stop dispatch; an `Err` is returned to
    /// the caller unchanged.
    fn validate(&self) -> Result<bool, CommandError>;

    /// Parameters handed to middleware and handler.
    fn params(&self) -> Params {
        Params::new()
    }
}

/// A command decoded from a structured payload such as
/// `{"command": "deploy", "params": {"env": "prod"}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommand {
    /// Handler key.
    pub key: String,
    /// Parameters, empty when the payload had none.
    pub params: Params,
}

impl RawCommand {
    /// Create a raw command.
    pub fn new(key: impl Into<String>, params: Params) -> Self {
        Self {
            key: key.into(),
            params,
        }
    }

    /// Decode a payload, checking it has the shape of a command.
    ///
    /// The payload must be a mapping with a string `command` field and, if
    /// present, a mapping (or null) `params` field. Anything else is
    /// [`CommandError::NotACommand`].
    pub fn from_value(payload: &Value) -> Result<Self, CommandError> {
        let object = payload
            .as_object()
            .ok_or_else(|| CommandError::not_a_command("payload is not a mapping"))?;

        let key = match object.get("command") {
            Some(Value::String(key)) => key.clone(),
            Some(_) => return Err(CommandError::not_a_command("'command' must be a string")),
            None => return Err(CommandError::not_a_command("missing 'command' field")),
        };

        let params = match object.get("params") {
            None | Some(Value::Null) => Params::new(),
            Some(Value::Object(params)) => params.clone(),
            Some(_) => return Err(CommandError::not_a_command("'params' must be a mapping")),
        };

        Ok(Self { key, params })
    }
}

impl Command for RawCommand {
    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<bool, CommandError> {
        if self.key.trim().is_empty() {
            return Err(CommandError::invalid("command key is empty"));
        }
        Ok(true)
    }

    fn params(&self) -> Params {
        self.params.clone()
    }
}
