//! The immutable configuration mapping handed to sources.
//!
//! A [`Config`] is a JSON object keyed by option name. Values may be numbers,
//! strings, booleans, arrays, or nested objects; class references are class
//! names resolved later by the source registry.
//!
//! Sources take their configuration by value and keep it behind an `Arc`, so
//! a template mapping reused across many sources is never aliased. The
//! builder-style [`Config::with`] consumes `self`; there is no `&mut` API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys;
use crate::validate::{type_name, ConfigError, ConfigResult};

/// Largest integer exactly representable in an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Immutable option mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: Map<String, Value>,
}

impl From<Map<String, Value>> for Config {
    fn from(values: Map<String, Value>) -> Self {
        Config { values }
    }
}

impl TryFrom<Value> for Config {
    type Error = ConfigError;

    fn try_from(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(values) => Ok(Config { values }),
            other => Err(ConfigError::ParseError(format!(
                "configuration must be an object, got {}",
                type_name(&other)
            ))),
        }
    }
}

impl Config {
    /// Empty configuration.
    pub fn new() -> Self {
        Config::default()
    }

    /// Parse a JSON object.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Config::try_from(value)
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Return a copy where every option absent (or null) here takes its value
    /// from `defaults`.
    pub fn or_defaults(&self, defaults: &Config) -> Config {
        let mut values = self.values.clone();
        for (key, value) in &defaults.values {
            if !self.contains(key) {
                values.insert(key.clone(), value.clone());
            }
        }
        Config { values }
    }

    /// Return a copy without `key`.
    pub fn without(mut self, key: &str) -> Self {
        self.values.remove(key);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Numeric option; `None` when absent or null.
    pub fn get_f64(&self, key: &str) -> ConfigResult<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| {
                ConfigError::invalid(key, format!("number {} is not representable as f64", n))
            }),
            Some(other) => Err(wrong_type(key, "number", other)),
        }
    }

    pub fn f64_or(&self, key: &str, default: f64) -> ConfigResult<f64> {
        Ok(self.get_f64(key)?.unwrap_or(default))
    }

    pub fn require_f64(&self, key: &str) -> ConfigResult<f64> {
        self.get_f64(key)?
            .ok_or_else(|| ConfigError::MissingField(key.to_string()))
    }

    /// Non-negative integer option. Integral floats (`1e6`) are accepted.
    pub fn get_u64(&self, key: &str) -> ConfigResult<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => {
                if let Some(u) = n.as_u64() {
                    return Ok(Some(u));
                }
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= MAX_SAFE_INTEGER => {
                        Ok(Some(f as u64))
                    }
                    _ => Err(ConfigError::invalid(
                        key,
                        format!("Must be a non-negative integer, got {}", n),
                    )),
                }
            }
            Some(other) => Err(wrong_type(key, "non-negative integer", other)),
        }
    }

    pub fn u64_or(&self, key: &str, default: u64) -> ConfigResult<u64> {
        Ok(self.get_u64(key)?.unwrap_or(default))
    }

    pub fn get_str(&self, key: &str) -> ConfigResult<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(wrong_type(key, "string", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> ConfigResult<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(wrong_type(key, "bool", other)),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> ConfigResult<bool> {
        Ok(self.get_bool(key)?.unwrap_or(default))
    }

    /// A scalar or a list of numbers; a scalar becomes a one-element list.
    pub fn get_f64_or_list(&self, key: &str) -> ConfigResult<Option<Vec<f64>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(_)) => Ok(self.get_f64(key)?.map(|v| vec![v])),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_f64().ok_or_else(|| {
                        wrong_type(&format!("{}[{}]", key, i), "number", item)
                    })
                })
                .collect::<ConfigResult<Vec<f64>>>()
                .map(Some),
            Some(other) => Err(wrong_type(key, "number or list of numbers", other)),
        }
    }

    /// List of strings; empty when absent.
    pub fn get_str_list(&self, key: &str) -> ConfigResult<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(wrong_type(&format!("{}[{}]", key, i), "string", other)),
                })
                .collect(),
            Some(other) => Err(wrong_type(key, "list of strings", other)),
        }
    }

    /// Names listed in the `sources` option, in order.
    pub fn source_names(&self) -> ConfigResult<Vec<String>> {
        self.source_entries()?
            .iter()
            .enumerate()
            .map(|(i, entry)| source_entry_name(i, entry).map(str::to_string))
            .collect()
    }

    /// Position of `name` in the `sources` list, if listed.
    pub fn source_index(&self, name: &str) -> ConfigResult<Option<usize>> {
        Ok(self.source_names()?.iter().position(|n| n == name))
    }

    /// Configuration of one source: model-level settings overlaid with that
    /// source's entry from `sources`, with `sources` itself removed and `name`
    /// set.
    ///
    /// Without a `sources` list every name is accepted. With one, the name
    /// must be listed.
    pub fn for_source(&self, name: &str) -> ConfigResult<Config> {
        let entries = self.source_entries()?;
        let mut merged = self.values.clone();
        merged.remove(keys::SOURCES);

        if self.contains(keys::SOURCES) {
            let mut found = false;
            for (i, entry) in entries.iter().enumerate() {
                if source_entry_name(i, entry)? != name {
                    continue;
                }
                if let Value::Object(overrides) = entry {
                    for (k, v) in overrides {
                        merged.insert(k.clone(), v.clone());
                    }
                }
                found = true;
                break;
            }
            if !found {
                return Err(ConfigError::UnknownSource(name.to_string()));
            }
        }

        merged.insert(keys::NAME.to_string(), Value::String(name.to_string()));
        Ok(Config { values: merged })
    }

    fn source_entries(&self) -> ConfigResult<&[Value]> {
        match self.get(keys::SOURCES) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(wrong_type(keys::SOURCES, "list of source entries", other)),
        }
    }
}

fn source_entry_name(index: usize, entry: &Value) -> ConfigResult<&str> {
    let field = format!("{}[{}].{}", keys::SOURCES, index, keys::NAME);
    match entry {
        Value::Object(map) => match map.get(keys::NAME) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(wrong_type(&field, "string", other)),
            None => Err(ConfigError::MissingField(field)),
        },
        other => Err(wrong_type(
            &format!("{}[{}]", keys::SOURCES, index),
            "object",
            other,
        )),
    }
}

fn wrong_type(field: &str, expected: &'static str, actual: &Value) -> ConfigError {
    ConfigError::WrongType {
        field: field.to_string(),
        expected,
        actual: type_name(actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_config() -> Config {
        Config::try_from(json!({
            "mu": 0,
            "sigma": 1.5,
            "sources": [
                {"name": "s0", "events_per_day": 1000.0},
                {"name": "s1", "mu": 2.0, "class": "GaussianMCSource"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_typed_getters() {
        let c = Config::new()
            .with("a", 2)
            .with("b", "qq")
            .with("c", true)
            .with("d", 1e6);
        assert_eq!(c.get_f64("a").unwrap(), Some(2.0));
        assert_eq!(c.get_str("b").unwrap(), Some("qq"));
        assert_eq!(c.get_bool("c").unwrap(), Some(true));
        assert_eq!(c.get_u64("d").unwrap(), Some(1_000_000));
        assert_eq!(c.get_f64("missing").unwrap(), None);
        assert_eq!(c.f64_or("missing", 7.0).unwrap(), 7.0);
    }

    #[test]
    fn test_wrong_type_is_error() {
        let c = Config::new().with("a", "text");
        assert!(matches!(
            c.get_f64("a"),
            Err(ConfigError::WrongType { expected: "number", .. })
        ));
        assert!(c.get_bool("a").is_err());
    }

    #[test]
    fn test_null_is_absent() {
        let c = Config::try_from(json!({"sigma": null})).unwrap();
        assert!(!c.contains("sigma"));
        assert_eq!(c.f64_or("sigma", 1.0).unwrap(), 1.0);
    }

    #[test]
    fn test_or_defaults_fills_only_absent() {
        let c = Config::try_from(json!({"mu": 2, "sigma": null})).unwrap();
        let defaults = Config::new().with("mu", 0).with("sigma", 1).with("n", 5);
        let filled = c.or_defaults(&defaults);
        assert_eq!(filled.get_f64("mu").unwrap(), Some(2.0));
        assert_eq!(filled.get_f64("sigma").unwrap(), Some(1.0));
        assert_eq!(filled.get_u64("n").unwrap(), Some(5));
        assert!(!c.contains("sigma"));
    }

    #[test]
    fn test_require_missing() {
        let c = Config::new();
        assert_eq!(
            c.require_f64("mu"),
            Err(ConfigError::MissingField("mu".to_string()))
        );
    }

    #[test]
    fn test_u64_rejects_fraction_and_negative() {
        let c = Config::new().with("a", 1.5).with("b", -3);
        assert!(c.get_u64("a").is_err());
        assert!(c.get_u64("b").is_err());
    }

    #[test]
    fn test_f64_or_list() {
        let c = Config::try_from(json!({"a": 1.0, "b": [1, 2.5], "c": ["x"]})).unwrap();
        assert_eq!(c.get_f64_or_list("a").unwrap(), Some(vec![1.0]));
        assert_eq!(c.get_f64_or_list("b").unwrap(), Some(vec![1.0, 2.5]));
        assert!(c.get_f64_or_list("c").is_err());
    }

    #[test]
    fn test_for_source_overlays_entry() {
        let c = model_config();
        let s1 = c.for_source("s1").unwrap();
        assert_eq!(s1.get_f64("mu").unwrap(), Some(2.0));
        assert_eq!(s1.get_f64("sigma").unwrap(), Some(1.5));
        assert_eq!(s1.get_str("class").unwrap(), Some("GaussianMCSource"));
        assert_eq!(s1.get_str("name").unwrap(), Some("s1"));
        assert!(!s1.contains("sources"));
    }

    #[test]
    fn test_for_source_unknown_name() {
        let c = model_config();
        assert_eq!(
            c.for_source("nope"),
            Err(ConfigError::UnknownSource("nope".to_string()))
        );
    }

    #[test]
    fn test_for_source_without_sources_list() {
        let c = Config::new().with("mu", 0);
        let s = c.for_source("anything").unwrap();
        assert_eq!(s.get_str("name").unwrap(), Some("anything"));
    }

    #[test]
    fn test_source_names_and_index() {
        let c = model_config();
        assert_eq!(c.source_names().unwrap(), vec!["s0", "s1"]);
        assert_eq!(c.source_index("s1").unwrap(), Some(1));
        assert_eq!(c.source_index("s9").unwrap(), None);
    }

    #[test]
    fn test_template_is_not_aliased() {
        let template = model_config();
        let derived = template.clone().with("mu", 42);
        assert_eq!(template.get_f64("mu").unwrap(), Some(0.0));
        assert_eq!(derived.get_f64("mu").unwrap(), Some(42.0));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Config::try_from(json!([1, 2])).is_err());
        assert!(Config::from_json_str("3").is_err());
    }
}
