//! Layered configuration for command-line applications.
//!
//! Values come from several providers, each with a fixed priority:
//!
//! | Provider              | Source                        | Default priority |
//! |-----------------------|-------------------------------|------------------|
//! | [`ArgsProvider`]      | parsed command-line arguments | 3                |
//! | [`EnvProvider`]       | prefixed environment vars     | 2                |
//! | [`FileProvider`]      | JSON / YAML / TOML document   | 1                |
//! | [`ConstantsProvider`] | hard-coded defaults           | 0                |
//!
//! Providers read their source once, when they are built. The
//! [`ConfigResolver`] then picks, for every key, the value of the
//! highest-priority provider that has it.
//!
//! # Example
//!
//! ```no_run
//! use clikit::config::{ArgsProvider, ConfigResolver, EnvProvider, FileProvider, Settings};
//! use serde_json::json;
//!
//! let resolver = ConfigResolver::builder()
//!     .provider(ArgsProvider::new(vec![("debug", json!(true))]))
//!     .provider(EnvProvider::new("MYAPP_").unwrap())
//!     .maybe_provider(FileProvider::discover("myapp").unwrap())
//!     .provider(Settings::defaults_provider())
//!     .build();
//!
//! let settings = Settings::load(&resolver).unwrap();
//! println!("format: {}", settings.format);
//! ```

pub mod args;
pub mod constants;
pub mod env;
pub mod error;
pub mod file;
pub mod provider;
pub mod resolver;
pub mod settings;

// Re-export main types for convenience
pub use self::args::{normalize_arg_id, ArgsProvider, ARGS_PRIORITY};
pub use self::constants::{ConstantsProvider, CONSTANTS_PRIORITY};
pub use self::env::{EnvProvider, ENV_PRIORITY};
pub use self::error::{ConfigError, ConfigResult};
pub use self::file::{DocumentFormat, FileProvider, FILE_PRIORITY};
pub use self::provider::{ConfigProvider, ValueMap};
pub use self::resolver::{ConfigResolver, ConfigResolverBuilder, Resolution, ResolvedConfiguration};
pub use self::settings::{OutputFormat, RetrySettings, Settings, SETTINGS_KEYS};
