//! Error types for configuration loading and resolution.

use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building providers or resolving configuration.
///
/// Provider read failures are only ever reported at construction time.
/// The resolver itself can only fail with [`ConfigError::KeyMissing`].
///
/// # Example
///
/// ```
/// use clikit::config::ConfigError;
///
/// let error = ConfigError::key_missing(vec!["token".to_string(), "host".to_string()]);
/// assert_eq!(error.to_string(), "missing required configuration keys: host, token");
/// ```
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider's backing source could not be read or parsed.
    #[error("configuration source unavailable ({source_label}): {reason}")]
    SourceUnavailable {
        /// Label of the provider whose source failed.
        source_label: String,
        /// Description of the failure.
        reason: String,
    },

    /// One or more required keys were absent from every provider.
    #[error("missing required configuration keys: {}", keys.join(", "))]
    KeyMissing {
        /// Every missing key, sorted.
        keys: Vec<String>,
    },

    /// A resolved value could not be converted into the requested type.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Key holding the offending value.
        key: String,
        /// Description of the conversion failure.
        reason: String,
    },

    /// Typed extraction of the whole configuration failed.
    #[error("failed to extract configuration: {reason}")]
    Extract {
        /// Description of the deserialization failure.
        reason: String,
    },
}

impl ConfigError {
    /// Create a SourceUnavailable error for the given provider label.
    pub fn source_unavailable(source_label: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_label: source_label.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a KeyMissing error. Keys are sorted and deduplicated.
    pub fn key_missing(mut keys: Vec<String>) -> Self {
        keys.sort();
        keys.dedup();
        Self::KeyMissing { keys }
    }

    /// Create an InvalidValue error for the given key.
    pub fn invalid_value(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Keys reported by a KeyMissing error, empty for every other kind.
    pub fn missing_keys(&self) -> &[String] {
        match self {
            Self::KeyMissing { keys } => keys,
            _ => &[],
        }
    }
}
