//! Structural schemas for command parameters.

use super::context::Params;
use super::error::Violation;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validates and normalizes a parameter map.
///
/// On success the returned map replaces the original parameters, so an
/// implementation may fill defaults or coerce values. On failure every
/// problem found is returned, not just the first.
pub trait Schema: Send + Sync {
    /// Validate `params`, returning the normalized form.
    fn validate(&self, params: &Params) -> Result<Params, Vec<Violation>>;
}

/// Type expected for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Text
    String,
    /// Whole number; numeric strings are coerced
    Integer,
    /// Any number; numeric strings are coerced
    Float,
    /// `true`/`false`; the strings `"true"`/`"false"` are coerced
    Boolean,
    /// Sequence
    Array,
    /// Mapping
    Object,
    /// Anything, unchecked
    #[default]
    Any,
}

impl FieldType {
    fn describe(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    /// Check `value`, coercing string input where the type allows it.
    fn normalize(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::Any, v) => Some(v.clone()),
            (Self::String, Value::String(_)) => Some(value.clone()),
            (Self::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
            (Self::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::Float, Value::Number(_)) => Some(value.clone()),
            (Self::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            (Self::Boolean, Value::Bool(_)) => Some(value.clone()),
            (Self::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (Self::Array, Value::Array(_)) => Some(value.clone()),
            (Self::Object, Value::Object(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

/// Declaration of one parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Parameter name.
    pub name: String,
    /// Expected type.
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    /// Whether the parameter must be present (after defaults are applied).
    #[serde(default)]
    pub required: bool,
    /// Value used when the parameter is absent.
    #[serde(default)]
    pub default: Option<Value>,
    /// Regular expression a string value must match.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Allowed values.
    #[serde(default)]
    pub choices: Option<Vec<Value>>,
}

impl FieldSpec {
    /// Declare an optional parameter.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            pattern: None,
            choices: None,
        }
    }

    /// Mark the parameter required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set a default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Require string values to match a regular expression.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Restrict the parameter to a fixed set of values.
    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }
}

/// Parameter schema made of field declarations.
///
/// Deserializable, so schemas can live next to the rest of an application's
/// configuration:
///
/// ```
/// use clikit::middleware::{ParamSchema, Schema};
/// use serde_json::json;
///
/// let schema: ParamSchema = serde_json::from_value(json!({
///     "fields": [
///         { "name": "count", "type": "integer", "default": 1 },
///         { "name": "name", "type": "string", "required": true }
///     ],
///     "deny_unknown": true
/// })).unwrap();
///
/// let params = json!({ "name": "demo", "count": "3" });
/// let normalized = schema.validate(params.as_object().unwrap()).unwrap();
/// assert_eq!(normalized["count"], json!(3));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSchema {
    /// Declared fields.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Reject parameters that are not declared.
    #[serde(default)]
    pub deny_unknown: bool,
}

impl ParamSchema {
    /// Create an empty schema that accepts anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Reject undeclared parameters.
    pub fn deny_unknown(mut self) -> Self {
        self.deny_unknown = true;
        self
    }

    fn check_field(spec: &FieldSpec, value: &Value, violations: &mut Vec<Violation>) -> Option<Value> {
        let Some(normalized) = spec.field_type.normalize(value) else {
            violations.push(Violation::new(
                &spec.name,
                format!("expected {}, got {}", spec.field_type.describe(), value),
            ));
            return None;
        };

        if let Some(pattern) = &spec.pattern {
            match (Regex::new(pattern), normalized.as_str()) {
                (Err(e), _) => {
                    violations.push(Violation::new(&spec.name, format!("invalid pattern: {}", e)));
                    return None;
                }
                (Ok(re), Some(text)) if !re.is_match(text) => {
                    violations.push(Violation::new(
                        &spec.name,
                        format!("'{}' does not match pattern {}", text, pattern),
                    ));
                    return None;
                }
                _ => {}
            }
        }

        if let Some(choices) = &spec.choices {
            if !choices.contains(&normalized) {
                let allowed = choices
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                violations.push(Violation::new(
                    &spec.name,
                    format!("{} is not one of [{}]", normalized, allowed),
                ));
                return None;
            }
        }

        Some(normalized)
    }
}

impl Schema for ParamSchema {
    fn validate(&self, params: &Params) -> Result<Params, Vec<Violation>> {
        let mut violations = Vec::new();
        let mut normalized = Params::new();

        for spec in &self.fields {
            let value = match params.get(&spec.name) {
                Some(Value::Null) | None => spec.default.clone(),
                Some(value) => Some(value.clone()),
            };
            match value {
                Some(value) => {
                    if let Some(value) = Self::check_field(spec, &value, &mut violations) {
                        normalized.insert(spec.name.clone(), value);
                    }
                }
                None if spec.required => {
                    violations.push(Violation::new(&spec.name, "is required"));
                }
                None => {}
            }
        }

        for (name, value) in params {
            if self.fields.iter().any(|f| &f.name == name) {
                continue;
            }
            if self.deny_unknown {
                violations.push(Violation::new(name, "unknown parameter"));
            } else {
                normalized.insert(name.clone(), value.clone());
            }
        }

        if violations.is_empty() {
            Ok(normalized)
        } else {
            Err(violations)
        }
    }
}

/// Schema backed by a closure.
pub struct FnSchema<F>(pub F);

impl<F> Schema for FnSchema<F>
where
    F: Fn(&Params) -> Result<Params, Vec<Violation>> + Send + Sync,
{
    fn validate(&self, params: &Params) -> Result<Params, Vec<Violation>> {
        (self.0)(params)
    }
}
