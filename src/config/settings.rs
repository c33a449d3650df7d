//! Typed framework settings built on top of a resolved configuration.

use super::constants::ConstantsProvider;
use super::error::{ConfigError, ConfigResult};
use super::resolver::{ConfigResolver, ResolvedConfiguration};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Every key the framework itself reads.
pub const SETTINGS_KEYS: &[&str] = &[
    "debug",
    "timeout",
    "format",
    "log_level",
    "log_file",
    "retry.max_retries",
    "retry.base_delay_ms",
];

/// Output format requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable table
    #[default]
    Table,
    /// JSON document
    Json,
    /// YAML document
    Yaml,
    /// Plain text
    Plain,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Plain => "plain",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "plain" | "text" => Ok(Self::Plain),
            other => Err(ConfigError::invalid_value(
                "format",
                format!("unknown output format '{}'", other),
            )),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total number of attempts, including the first one.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl RetrySettings {
    /// Base delay as a duration.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Settings every command sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Verbose diagnostics.
    #[serde(default)]
    pub debug: bool,
    /// Command timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Output format for command results.
    #[serde(default)]
    pub format: OutputFormat,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Markdown invocation log. No log file when unset.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Retry policy for failing commands.
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            timeout: default_timeout(),
            format: OutputFormat::default(),
            log_level: default_log_level(),
            log_file: None,
            retry: RetrySettings::default(),
        }
    }
}

impl Settings {
    /// Lowest-priority provider holding the framework defaults.
    pub fn defaults_provider() -> ConstantsProvider {
        let defaults = Self::default();
        ConstantsProvider::new(vec![
            ("debug", json!(defaults.debug)),
            ("timeout", json!(defaults.timeout)),
            ("format", json!(defaults.format)),
            ("log_level", json!(defaults.log_level)),
            (
                "retry",
                json!({
                    "max_retries": defaults.retry.max_retries,
                    "base_delay_ms": defaults.retry.base_delay_ms,
                }),
            ),
        ])
    }

    /// Build settings from an already resolved configuration.
    ///
    /// Format names are matched case-insensitively before deserializing.
    pub fn from_resolved(resolved: &ResolvedConfiguration) -> ConfigResult<Self> {
        let mut nested = resolved.to_nested();
        if let Some(format) = nested.get_mut("format") {
            if let Some(name) = format.as_str() {
                *format = json!(name.parse::<OutputFormat>()?);
            }
        }
        serde_json::from_value(nested).map_err(|e| ConfigError::Extract {
            reason: e.to_string(),
        })
    }

    /// Resolve the framework keys and build settings.
    pub fn load(resolver: &ConfigResolver) -> ConfigResult<Self> {
        let resolved = resolver.resolve(SETTINGS_KEYS.iter().copied())?;
        Self::from_resolved(&resolved)
    }

    /// Command timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
