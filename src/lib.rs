//! CLI Kit - building blocks for command-line applications
//!
//! clikit provides the pipeline that sits between a command-line front-end
//! and the code that actually runs a command:
//!
//! - **`config`** - Layered configuration: arguments, environment, files and defaults
//! - **`middleware`** - Middleware chains (logging, validation, retry) around handlers
//! - **`dispatch`** - Command validation and routing to registered handlers
//! - **`observability`** - `tracing` setup and a markdown invocation log
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! clikit = "0.3"
//! # Only configuration resolution:
//! clikit = { version = "0.3", default-features = false, features = ["config"] }
//! # Everything, including clap integration:
//! clikit = { version = "0.3", features = ["all"] }
//! ```
//!
//! # Example
//!
//! ```
//! use clikit::prelude::*;
//! use serde_json::json;
//!
//! // Resolve configuration once per process.
//! let resolver = ConfigResolver::builder()
//!     .provider(ArgsProvider::new(vec![("retry", json!({ "max_retries": 2 }))]))
//!     .provider(Settings::defaults_provider())
//!     .build();
//! let settings = Settings::load(&resolver).unwrap();
//!
//! // Compose the middleware once, then register handlers.
//! let pipeline = Pipeline::new()
//!     .with(LoggingMiddleware::new())
//!     .with(RetryMiddleware::from_settings(&settings.retry));
//! let mut dispatcher = CommandDispatcher::with_middleware(pipeline);
//! dispatcher
//!     .register("version", |_cmd, _ctx: &mut ExecutionContext| Ok(json!("0.3.0")))
//!     .unwrap();
//!
//! // Dispatch exactly one command.
//! let output = dispatcher.dispatch_value(&json!({ "command": "version" })).unwrap();
//! assert_eq!(output, json!("0.3.0"));
//! ```

#![warn(missing_docs)]

/// Layered configuration (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Observability utilities (enabled with the `observability` feature)
#[cfg(feature = "observability")]
pub mod observability;

/// Middleware chains (enabled with the `middleware` feature)
#[cfg(feature = "middleware")]
pub mod middleware;

/// Command dispatch (enabled with the `dispatch` feature)
#[cfg(feature = "dispatch")]
pub mod dispatch;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "config")]
    pub use crate::config::{
        ArgsProvider, ConfigError, ConfigProvider, ConfigResolver, ConstantsProvider,
        EnvProvider, FileProvider, ResolvedConfiguration, Settings,
    };

    #[cfg(feature = "observability")]
    pub use crate::observability::{init_tracing, InvocationLog};

    #[cfg(feature = "middleware")]
    pub use crate::middleware::{
        compose_middleware, CommandError, CommandResult, ExecutionContext, LoggingMiddleware,
        Middleware, MiddlewareChain, Next, ParamSchema, Pipeline, RetryMiddleware,
        ValidationMiddleware,
    };

    #[cfg(feature = "dispatch")]
    pub use crate::dispatch::{Command, CommandDispatcher, RawCommand};
}
