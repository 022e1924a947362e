//! Configuration errors and semantic validation.

use thiserror::Error;

/// Validation result type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading and validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Wrong type for {field}: expected {expected}, got {actual}")]
    WrongType {
        field: String,
        expected: &'static str,
        actual: String,
    },

    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::IoError(_) => 60,
            ConfigError::ParseError(_) => 61,
            ConfigError::MissingField(_) => 64,
            ConfigError::InvalidValue { .. } => 65,
            ConfigError::WrongType { .. } => 66,
            ConfigError::UnknownSource(_) => 67,
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Name of a JSON value's type, for error messages.
pub fn type_name(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
    .to_string()
}

/// Require a finite, strictly positive value (scale parameters).
pub fn validate_positive(field: &str, value: f64) -> ConfigResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::invalid(
            field,
            format!("Must be finite and positive, got {}", value),
        ));
    }
    Ok(value)
}

/// Require a finite, non-negative value (rates, exposures).
pub fn validate_non_negative(field: &str, value: f64) -> ConfigResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::invalid(
            field,
            format!("Must be finite and non-negative, got {}", value),
        ));
    }
    Ok(value)
}

/// Require a finite value (location parameters).
pub fn validate_finite(field: &str, value: f64) -> ConfigResult<f64> {
    if !value.is_finite() {
        return Err(ConfigError::invalid(
            field,
            format!("Must be finite, got {}", value),
        ));
    }
    Ok(value)
}

/// Require a non-zero count.
pub fn validate_positive_count(field: &str, value: u64) -> ConfigResult<u64> {
    if value == 0 {
        return Err(ConfigError::invalid(field, "Must be at least 1"));
    }
    Ok(value)
}

/// Validate one dimension's bin edges: at least two, finite, strictly increasing.
pub fn validate_bin_edges(field: &str, edges: &[f64]) -> ConfigResult<()> {
    if edges.len() < 2 {
        return Err(ConfigError::invalid(
            field,
            format!("Needs at least 2 bin edges, got {}", edges.len()),
        ));
    }
    for (i, e) in edges.iter().enumerate() {
        if !e.is_finite() {
            return Err(ConfigError::invalid(
                format!("{}[{}]", field, i),
                format!("Bin edge must be finite, got {}", e),
            ));
        }
        if i > 0 && edges[i - 1] >= *e {
            return Err(ConfigError::invalid(
                field,
                format!(
                    "Bin edges must be strictly increasing, got edges[{}]={} and edges[{}]={}",
                    i - 1,
                    edges[i - 1],
                    i,
                    e
                ),
            ));
        }
    }
    Ok(())
}
