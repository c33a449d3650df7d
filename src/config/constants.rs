//! Provider backed by hard-coded defaults.

use super::provider::{flatten_into, lookup, ConfigProvider, ValueMap};
use serde_json::Value;

/// Default priority of [`ConstantsProvider`]. Defaults lose to everything.
pub const CONSTANTS_PRIORITY: i32 = 0;

/// A fixed map of default values.
#[derive(Debug, Clone)]
pub struct ConstantsProvider {
    values: ValueMap,
    priority: i32,
    label: String,
}

impl ConstantsProvider {
    /// Build from key/value pairs. Nested objects are flattened.
    pub fn new<I, K>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut values = ValueMap::new();
        for (key, value) in defaults {
            flatten_into(key.as_ref(), value, &mut values);
        }
        Self {
            values,
            priority: CONSTANTS_PRIORITY,
            label: "defaults".to_string(),
        }
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
}

impl ConfigProvider for ConstantsProvider {
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
