//! Observability for command invocations.
//!
//! Two channels are provided:
//!
//! - structured `tracing` events, emitted throughout the crate and printed
//!   to stderr once [`init_tracing`] installs a subscriber;
//! - an [`InvocationLog`], a markdown file with one section per command
//!   invocation, written by `LoggingMiddleware` when one is attached.
//!
//! # Example
//!
//! ```no_run
//! use clikit::observability::{init_tracing, InvocationLog};
//!
//! init_tracing("info").unwrap();
//! let log = InvocationLog::new(None).unwrap();
//! println!("logging invocations to {}", log.log_file().display());
//! ```

pub mod logger;

// Re-export main types for convenience
pub use logger::InvocationLog;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Returns `Ok(false)`
/// when a global subscriber was already installed.
pub fn init_tracing(default_level: &str) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level: {}", default_level))?,
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();

    Ok(installed)
}

/// Level to pass to [`init_tracing`]: `debug` wins over the configured level.
pub fn effective_level(debug: bool, log_level: &str) -> &str {
    if debug {
        "debug"
    } else {
        log_level
    }
}
