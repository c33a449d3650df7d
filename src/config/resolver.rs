//! Precedence resolution across configuration providers.

use super::error::{ConfigError, ConfigResult};
use super::provider::{unflatten, ConfigProvider};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The resolved key.
    pub key: String,
    /// The winning value.
    pub value: Value,
    /// Label of the provider that supplied it.
    pub source_label: String,
    /// Priority of that provider.
    pub priority: i32,
}

/// The effective configuration produced by one resolution pass.
///
/// Immutable once built. Entries are kept sorted so equality and
/// iteration order are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfiguration {
    values: BTreeMap<String, Value>,
}

impl ResolvedConfiguration {
    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a string value. Numbers and booleans are rendered as text.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Get an unsigned integer value.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.values.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get a boolean value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Rebuild the nested document and deserialize it into `T`.
    pub fn extract<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        serde_json::from_value(self.to_nested()).map_err(|e| ConfigError::Extract {
            reason: e.to_string(),
        })
    }

    /// The resolved values as a nested JSON object.
    pub fn to_nested(&self) -> Value {
        unflatten(self.values.iter())
    }

    /// Check whether a key was resolved.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolved keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over resolved entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl From<ResolvedConfiguration> for BTreeMap<String, Value> {
    fn from(resolved: ResolvedConfiguration) -> Self {
        resolved.values
    }
}

/// Merges an ordered list of providers into one configuration.
///
/// For every key the provider with the highest priority that has the key
/// wins. Providers sharing a priority are ranked by declaration order:
/// the one added first wins.
///
/// # Example
///
/// ```
/// use clikit::config::{ArgsProvider, ConfigResolver, ConstantsProvider, EnvProvider};
/// use serde_json::json;
///
/// let resolver = ConfigResolver::builder()
///     .provider(ArgsProvider::new(vec![("debug", json!(true))]))
///     .provider(EnvProvider::from_vars("APP_", vec![("APP_DEBUG", "false"), ("APP_TIMEOUT", "30")]))
///     .provider(ConstantsProvider::new(vec![("timeout", json!(10)), ("format", json!("table"))]))
///     .build();
///
/// let resolved = resolver.resolve(["debug", "timeout", "format"]).unwrap();
/// assert_eq!(resolved.get("debug"), Some(&json!(true)));
/// assert_eq!(resolved.get("timeout"), Some(&json!(30)));
/// assert_eq!(resolved.get("format"), Some(&json!("table")));
/// ```
#[derive(Debug, Default)]
pub struct ConfigResolver {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl ConfigResolver {
    /// Create a resolver from providers in declaration order.
    pub fn new(providers: Vec<Box<dyn ConfigProvider>>) -> Self {
        Self { providers }
    }

    /// Start building a resolver.
    pub fn builder() -> ConfigResolverBuilder {
        ConfigResolverBuilder::default()
    }

    /// Providers in declaration order.
    pub fn providers(&self) -> &[Box<dyn ConfigProvider>] {
        &self.providers
    }

    /// Resolve a set of keys. Keys no provider knows are left out.
    pub fn resolve<I, K>(&self, keys: I) -> ConfigResult<ResolvedConfiguration>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.resolve_required(keys, std::iter::empty::<&str>())
    }

    /// Resolve a set of keys, failing if any required key is absent everywhere.
    ///
    /// Required keys are resolved even when `keys` does not list them. All
    /// missing required keys are reported in one error.
    pub fn resolve_required<I, K, R, Q>(
        &self,
        keys: I,
        required: R,
    ) -> ConfigResult<ResolvedConfiguration>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
        R: IntoIterator<Item = Q>,
        Q: AsRef<str>,
    {
        let required: BTreeSet<String> = required
            .into_iter()
            .map(|k| k.as_ref().to_string())
            .collect();
        let mut wanted: BTreeSet<String> = keys
            .into_iter()
            .map(|k| k.as_ref().to_string())
            .collect();
        wanted.extend(required.iter().cloned());

        let mut values = BTreeMap::new();
        for key in &wanted {
            if let Some(resolution) = self.explain(key) {
                tracing::debug!(
                    key = %key,
                    source = %resolution.source_label,
                    priority = resolution.priority,
                    "resolved configuration key"
                );
                values.insert(resolution.key, resolution.value);
            }
        }

        let missing: Vec<String> = required
            .into_iter()
            .filter(|k| !values.contains_key(k))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::key_missing(missing));
        }

        Ok(ResolvedConfiguration { values })
    }

    /// Resolve every key any provider knows about.
    pub fn resolve_all(&self) -> ConfigResult<ResolvedConfiguration> {
        let keys: BTreeSet<String> = self.providers.iter().flat_map(|p| p.keys()).collect();
        self.resolve(keys)
    }

    /// Report which provider wins for `key`.
    pub fn explain(&self, key: &str) -> Option<Resolution> {
        let mut best: Option<(&dyn ConfigProvider, Value)> = None;
        for provider in &self.providers {
            let Some(value) = provider.get(key) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((current, _)) => provider.priority() > current.priority(),
            };
            if better {
                best = Some((provider.as_ref(), value));
            }
        }

        best.map(|(provider, value)| Resolution {
            key: key.to_string(),
            value,
            source_label: provider.source_label().to_string(),
            priority: provider.priority(),
        })
    }
}

/// Builder for [`ConfigResolver`].
#[derive(Debug, Default)]
pub struct ConfigResolverBuilder {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl ConfigResolverBuilder {
    /// Append a provider. Declaration order breaks priority ties.
    pub fn provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Append a provider if present, e.g. the result of `FileProvider::discover`.
    pub fn maybe_provider<P: ConfigProvider + 'static>(self, provider: Option<P>) -> Self {
        match provider {
            Some(provider) => self.provider(provider),
            None => self,
        }
    }

    /// Finish building.
    pub fn build(self) -> ConfigResolver {
        ConfigResolver::new(self.providers)
    }
}
