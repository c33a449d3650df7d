//! Provider backed by a structured document on disk.

use super::error::{ConfigError, ConfigResult};
use super::provider::{flatten, lookup, ConfigProvider, ValueMap};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default priority of [`FileProvider`].
pub const FILE_PRIORITY: i32 = 1;

/// File names searched by [`FileProvider::discover`], in order.
pub const DISCOVERY_FILES: &[&str] = &["config.toml", "config.yaml", "config.yml", "config.json"];

/// Encoding of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON document
    Json,
    /// YAML document
    #[cfg(feature = "yaml")]
    Yaml,
    /// TOML document
    Toml,
}

impl DocumentFormat {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            #[cfg(feature = "yaml")]
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }

    /// Parse document text into a JSON value.
    pub fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            #[cfg(feature = "yaml")]
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str::<toml::Value>(content)
                .map_err(|e| e.to_string())
                .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        }
    }
}

/// Configuration loaded from a JSON, YAML or TOML file.
///
/// The document is read and flattened once, in [`FileProvider::load`].
/// Its root must be a mapping; nested mappings become dotted keys.
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    values: ValueMap,
    priority: i32,
    label: String,
}

impl FileProvider {
    /// Load a configuration file, choosing the decoder from its extension.
    ///
    /// Unknown extensions are tried as JSON, then YAML. `~` and `$VAR`
    /// in the path are expanded.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = path.as_ref().to_string_lossy().to_string();
        let label = format!("file:{}", raw);

        let expanded = shellexpand::full(&raw)
            .map_err(|e| ConfigError::source_unavailable(label.clone(), e))?;
        let path = PathBuf::from(expanded.into_owned());

        let content = fs::read_to_string(&path).map_err(|e| {
            ConfigError::source_unavailable(
                label.clone(),
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;

        let document = match DocumentFormat::from_path(&path) {
            Some(format) => format.parse(&content),
            None => Self::parse_unknown(&content),
        }
        .map_err(|e| {
            ConfigError::source_unavailable(
                label.clone(),
                format!("failed to parse {}: {}", path.display(), e),
            )
        })?;

        Self::from_document(path, label, document)
    }

    /// Build from document text that has already been read.
    pub fn parse_str(content: &str, format: DocumentFormat) -> ConfigResult<Self> {
        let label = "file:<inline>".to_string();
        let document = format
            .parse(content)
            .map_err(|e| ConfigError::source_unavailable(label.clone(), e))?;
        Self::from_document(PathBuf::new(), label, document)
    }

    /// Look for `config.{toml,yaml,yml,json}` in the per-user config directory.
    ///
    /// Returns `Ok(None)` when no file exists. A file that exists but cannot
    /// be parsed is still an error.
    pub fn discover(app_name: &str) -> ConfigResult<Option<Self>> {
        match dirs::config_dir() {
            Some(base) => Self::discover_in(&base.join(app_name)),
            None => Ok(None),
        }
    }

    /// Look for a discoverable config file inside `dir`.
    pub fn discover_in(dir: &Path) -> ConfigResult<Option<Self>> {
        for name in DISCOVERY_FILES {
            let candidate = dir.join(name);
            if DocumentFormat::from_path(&candidate).is_none() {
                continue;
            }
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "discovered config file");
                return Self::load(candidate).map(Some);
            }
        }
        Ok(None)
    }

    fn parse_unknown(content: &str) -> Result<Value, String> {
        match DocumentFormat::Json.parse(content) {
            Ok(value) => Ok(value),
            #[cfg(feature = "yaml")]
            Err(_) => DocumentFormat::Yaml.parse(content),
            #[cfg(not(feature = "yaml"))]
            Err(e) => Err(e),
        }
    }

    fn from_document(path: PathBuf, label: String, document: Value) -> ConfigResult<Self> {
        match document {
            Value::Object(_) => {}
            // An empty YAML document parses as null.
            Value::Null => {
                return Ok(Self {
                    path,
                    values: ValueMap::new(),
                    priority: FILE_PRIORITY,
                    label,
                })
            }
            other => {
                return Err(ConfigError::source_unavailable(
                    label,
                    format!("document root must be a mapping, found {}", kind_of(&other)),
                ))
            }
        }

        Ok(Self {
            path,
            values: flatten(document),
            priority: FILE_PRIORITY,
            label,
        })
    }

    /// Override the default priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Path the document was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for FileProvider {
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

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
