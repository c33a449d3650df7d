//! Provider backed by process environment variables.

use super::error::{ConfigError, ConfigResult};
use super::provider::{coerce_scalar, lookup, ConfigProvider, ValueMap, KEY_SEPARATOR};
use serde_json::Value;
use std::ffi::OsString;
use std::path::Path;

/// Default priority of [`EnvProvider`].
pub const ENV_PRIORITY: i32 = 2;

/// Configuration read from environment variables sharing a prefix.
///
/// With prefix `MYAPP_`, the variable `MYAPP_RETRY__MAX_RETRIES=5` answers
/// the key `retry.max_retries` with the number `5`. The environment is
/// snapshotted when the provider is built; later changes are not seen.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    prefix: String,
    values: ValueMap,
    priority: i32,
    label: String,
}

impl EnvProvider {
    /// Snapshot the process environment.
    ///
    /// Fails if a variable carrying the prefix is not valid unicode.
    pub fn new(prefix: impl Into<String>) -> ConfigResult<Self> {
        Self::from_os_vars(prefix, std::env::vars_os())
    }

    /// Build from an explicit list of variables.
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefix = prefix.into();
        let mut values = ValueMap::new();
        for (name, raw) in vars {
            if let Some(key) = env_key(&prefix, name.as_ref()) {
                values.insert(key, coerce_scalar(raw.as_ref()));
            }
        }
        Self::with_values(prefix, values)
    }

    /// Build from raw OS strings, rejecting non-unicode names or values under the prefix.
    pub fn from_os_vars<I>(prefix: impl Into<String>, vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let prefix = prefix.into();
        let label = env_label(&prefix);
        let mut decoded = Vec::new();
        for (name, raw) in vars {
            let name = match name.into_string() {
                Ok(name) => name,
                Err(name) => {
                    if name.to_string_lossy().starts_with(prefix.as_str()) {
                        return Err(ConfigError::source_unavailable(
                            label,
                            format!("variable name {:?} is not valid unicode", name),
                        ));
                    }
                    continue;
                }
            };
            if !name.starts_with(prefix.as_str()) {
                continue;
            }
            let raw = raw.into_string().map_err(|_| {
                ConfigError::source_unavailable(
                    label.clone(),
                    format!("value of {} is not valid unicode", name),
                )
            })?;
            decoded.push((name, raw));
        }
        Ok(Self::from_vars(prefix, decoded))
    }

    /// Snapshot the process environment, layered over a dotenv file.
    ///
    /// Process variables win over values from the file. A missing or
    /// malformed file fails construction.
    pub fn with_env_file(prefix: impl Into<String>, path: &Path) -> ConfigResult<Self> {
        let prefix = prefix.into();
        let label = env_label(&prefix);

        let iter = dotenv::from_path_iter(path).map_err(|e| {
            ConfigError::source_unavailable(
                label.clone(),
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;

        let mut file_vars = Vec::new();
        for item in iter {
            let (name, value) = item.map_err(|e| {
                ConfigError::source_unavailable(
                    label.clone(),
                    format!("failed to parse {}: {}", path.display(), e),
                )
            })?;
            file_vars.push((name, value));
        }

        let from_file = Self::from_vars(prefix.clone(), file_vars);
        let from_process = Self::new(prefix.clone())?;

        let mut values = from_file.values;
        values.extend(from_process.values);
        tracing::debug!(
            path = %path.display(),
            keys = values.len(),
            "loaded environment with dotenv file"
        );
        Ok(Self::with_values(prefix, values))
    }

    fn with_values(prefix: String, values: ValueMap) -> Self {
        Self {
            label: env_label(&prefix),
            prefix,
            values,
            priority: ENV_PRIORITY,
        }
    }

    /// Override the default priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// The variable prefix this provider filters on.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl ConfigProvider for EnvProvider {
    fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.values, key)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn source_label(&self) -> &str {
        &self.label
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Map `PREFIX_SECTION__NAME` to `section.name`, or `None` if the prefix does not match.
fn env_key(prefix: &str, name: &str) -> Option<String> {
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() {
        return None;
    }
    Some(
        rest.to_lowercase()
            .replace("__", &KEY_SEPARATOR.to_string()),
    )
}

fn env_label(prefix: &str) -> String {
    if prefix.is_empty() {
        "env".to_string()
    } else {
        format!("env:{}", prefix)
    }
}
