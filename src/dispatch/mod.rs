//! Command dispatch.
//!
//! The [`CommandDispatcher`] checks a command's own data, finds the handler
//! registered for its key and runs it inside the dispatcher's middleware
//! pipeline. Every outcome, including a handler panic, comes back as a
//! [`CommandResult`](crate::middleware::CommandResult).
//!
//! Commands are any type implementing [`Command`]. Untyped input from a
//! front-end (e.g. a JSON request) goes through [`RawCommand::from_value`],
//! which rejects payloads that do not have the shape of a command.

mod command;
mod dispatcher;

pub use command::{Command, RawCommand};
pub use dispatcher::{CommandDispatcher, CommandHandler};

#[cfg(test)]
mod tests;
