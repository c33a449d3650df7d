//! The provider contract and the helpers shared by every provider.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Backing map of a provider: dotted key to value.
pub type ValueMap = BTreeMap<String, Value>;

/// Separator between segments of a nested key.
pub const KEY_SEPARATOR: char = '.';

/// A read-only source of configuration values.
///
/// Providers parse their backing source once, at construction time, and
/// never change afterwards. A provider that cannot read its source fails
/// in its constructor, so `get` has no error path.
///
/// # Object Safety
///
/// This trait is object-safe; the resolver stores `Box<dyn ConfigProvider>`.
pub trait ConfigProvider: fmt::Debug + Send + Sync {
    /// Look up a single dotted key.
    fn get(&self, key: &str) -> Option<Value>;

    /// Precedence of this provider. Higher wins.
    fn priority(&self) -> i32;

    /// Human readable label used in diagnostics.
    fn source_label(&self) -> &str;

    /// Every key this provider can answer.
    fn keys(&self) -> Vec<String>;

    /// Check whether this provider holds a value for `key`.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Flatten a nested JSON value into dotted keys.
///
/// Objects are walked recursively; arrays and scalars become leaves.
/// Empty objects are kept as leaves so `{"plugins": {}}` still answers
/// `plugins`.
pub fn flatten_into(prefix: &str, value: Value, out: &mut ValueMap) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{}{}{}", prefix, KEY_SEPARATOR, key)
                };
                flatten_into(&path, child, out);
            }
        }
        other => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), other);
            }
        }
    }
}

/// Flatten a top-level JSON object. Non-object roots produce an empty map.
pub fn flatten(value: Value) -> ValueMap {
    let mut out = ValueMap::new();
    if value.is_object() {
        flatten_into("", value, &mut out);
    }
    out
}

/// Rebuild a nested JSON object from dotted keys.
///
/// When a key is both a leaf and a parent (`a = 1` and `a.b = 2`), the
/// nested form wins.
pub fn unflatten<'a, I, K>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, &'a Value)>,
    K: AsRef<str>,
{
    let mut root = Map::new();
    'entries: for (key, value) in entries {
        let mut segments: Vec<&str> = key.as_ref().split(KEY_SEPARATOR).collect();
        let leaf = segments.pop().unwrap_or_default();
        let mut cursor = &mut root;
        for segment in segments {
            let slot = cursor
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(map) = slot.as_object_mut() else {
                continue 'entries;
            };
            cursor = map;
        }
        match cursor.get(leaf) {
            Some(Value::Object(_)) => {}
            _ => {
                cursor.insert(leaf.to_string(), value.clone());
            }
        }
    }
    Value::Object(root)
}

/// Look up `key` in a flattened map.
///
/// A leaf is returned as is. Otherwise every entry under `key.` is
/// gathered back into an object, so section keys such as `retry` answer
/// with their whole subtree.
pub fn lookup(values: &ValueMap, key: &str) -> Option<Value> {
    if let Some(value) = values.get(key) {
        return Some(value.clone());
    }

    let prefix = format!("{}{}", key, KEY_SEPARATOR);
    let section: Vec<(&str, &Value)> = values
        .range(prefix.clone()..)
        .take_while(|(k, _)| k.starts_with(&prefix))
        .map(|(k, v)| (&k[prefix.len()..], v))
        .collect();

    if section.is_empty() {
        None
    } else {
        Some(unflatten(section))
    }
}

/// Interpret a raw string the way a shell user means it.
///
/// `true`/`false` become booleans. Numbers become numbers only when they
/// render back to exactly the same text, so `007`, `1.10` or an integer
/// too large for 64 bits stay strings. Anything else stays a string.
pub fn coerce_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        if int.to_string() == trimmed {
            return Value::from(int);
        }
    }
    if let Ok(int) = trimmed.parse::<u64>() {
        if int.to_string() == trimmed {
            return Value::from(int);
        }
    }
    if let Some(number) = trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        if number.to_string() == trimmed {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}
