//! Provider backed by parsed command-line arguments.

use super::provider::{flatten_into, lookup, ConfigProvider, ValueMap};
use serde_json::Value;

/// Default priority of [`ArgsProvider`]. Arguments beat everything else.
pub const ARGS_PRIORITY: i32 = 3;

/// Configuration supplied on the command line.
///
/// The front-end hands over the argument map it parsed. Entries holding
/// `null` mean "flag not given" and are dropped, so they never hide a value
/// from a lower-priority provider.
#[derive(Debug, Clone)]
pub struct ArgsProvider {
    values: ValueMap,
    priority: i32,
    label: String,
}

impl ArgsProvider {
    /// Build from an already-parsed argument map.
    pub fn new<I, K>(args: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut values = ValueMap::new();
        for (key, value) in args {
            if value.is_null() {
                continue;
            }
            flatten_into(&normalize_arg_id(key.as_ref()), value, &mut values);
        }
        values.retain(|_, v| !v.is_null());

        Self {
            values,
            priority: ARGS_PRIORITY,
            label: "args".to_string(),
        }
    }

    /// Build from clap matches, keeping only values typed on the command line.
    ///
    /// Values filled in by clap defaults or `env = ..` attributes are skipped;
    /// those belong to the constants and environment providers.
    #[cfg(feature = "cli")]
    pub fn from_matches(matches: &clap::ArgMatches) -> Self {
        use clap::parser::ValueSource;

        let mut args = Vec::new();
        for id in matches.ids() {
            let id = id.as_str();
            if matches.value_source(id) != Some(ValueSource::CommandLine) {
                continue;
            }
            if let Some(value) = match_value(matches, id) {
                args.push((id.to_string(), value));
            }
        }
        Self::new(args)
    }

    /// Override the default priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Override the diagnostic label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigProvider for ArgsProvider {
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

/// Map an argument id (`retry__max-retries`) onto a config key (`retry.max_retries`).
pub fn normalize_arg_id(id: &str) -> String {
    id.trim_start_matches('-')
        .replace("__", ".")
        .replace('-', "_")
}

#[cfg(feature = "cli")]
fn match_value(matches: &clap::ArgMatches, id: &str) -> Option<Value> {
    if let Ok(Some(values)) = matches.try_get_many::<String>(id) {
        let values: Vec<Value> = values.map(|v| super::provider::coerce_scalar(v)).collect();
        return match values.len() {
            0 => None,
            1 => values.into_iter().next(),
            _ => Some(Value::Array(values)),
        };
    }
    if let Ok(Some(flag)) = matches.try_get_one::<bool>(id) {
        return Some(Value::Bool(*flag));
    }
    if let Ok(Some(count)) = matches.try_get_one::<u8>(id) {
        return Some(Value::from(*count));
    }
    None
}
