//! Event-rate binding.
//!
//! A source's `events_per_day` is its base rate times a product of factors
//! read from the configuration. Factors are independent, so the order in
//! which a policy lists them never changes the result.

use std::fmt::Debug;

use bi_config::validate::{type_name, validate_non_negative};
use bi_config::{keys, Config, ConfigError, ConfigResult};

use crate::error::Result;

/// One multiplicative contribution to a source's rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateFactor {
    /// The option's numeric value.
    Numeric(String),
    /// The length, in characters, of the option's string value.
    StringLength(String),
}

impl RateFactor {
    pub fn numeric(key: impl Into<String>) -> Self {
        RateFactor::Numeric(key.into())
    }

    pub fn string_length(key: impl Into<String>) -> Self {
        RateFactor::StringLength(key.into())
    }

    pub fn key(&self) -> &str {
        match self {
            RateFactor::Numeric(key) | RateFactor::StringLength(key) => key,
        }
    }

    /// Factor value under `config`; an absent option contributes 1.
    pub fn evaluate(&self, config: &Config) -> ConfigResult<f64> {
        let key = self.key();
        let Some(value) = config.get(key) else {
            return Ok(1.0);
        };
        match self {
            RateFactor::Numeric(_) => {
                let v = value.as_f64().ok_or_else(|| ConfigError::WrongType {
                    field: key.to_string(),
                    expected: "number",
                    actual: type_name(value),
                })?;
                if !v.is_finite() {
                    return Err(ConfigError::InvalidValue {
                        field: key.to_string(),
                        message: format!("Must be finite, got {}", v),
                    });
                }
                Ok(v)
            }
            RateFactor::StringLength(_) => {
                let s = value.as_str().ok_or_else(|| ConfigError::WrongType {
                    field: key.to_string(),
                    expected: "string",
                    actual: type_name(value),
                })?;
                Ok(s.chars().count() as f64)
            }
        }
    }
}

/// How a source turns its configuration into `events_per_day`.
pub trait RatePolicy: Send + Sync + Debug {
    fn factors(&self) -> &[RateFactor];

    /// Option names the policy reads. They scale a source without changing
    /// its shape, so they stay out of the PDF fingerprint.
    fn keys(&self) -> Vec<&str> {
        self.factors().iter().map(RateFactor::key).collect()
    }

    /// `base_rate` times every factor. The result must be finite and
    /// non-negative.
    fn bind(&self, config: &Config, base_rate: f64) -> Result<f64> {
        let mut rate = base_rate;
        for factor in self.factors() {
            rate *= factor.evaluate(config)?;
        }
        if !rate.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: keys::EVENTS_PER_DAY.to_string(),
                message: format!("Rate must be finite, got {}", rate),
            }
            .into());
        }
        Ok(validate_non_negative(keys::EVENTS_PER_DAY, rate)?)
    }
}

/// A fixed list of multiplicative factors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiplierRate {
    factors: Vec<RateFactor>,
}

impl MultiplierRate {
    pub fn new(factors: Vec<RateFactor>) -> Self {
        MultiplierRate { factors }
    }

    /// `some_multiplier` (numeric) and `strlen_multiplier` (string length).
    pub fn gaussian_default() -> Self {
        MultiplierRate::new(vec![
            RateFactor::numeric(keys::SOME_MULTIPLIER),
            RateFactor::string_length(keys::STRLEN_MULTIPLIER),
        ])
    }
}

impl RatePolicy for MultiplierRate {
    fn factors(&self) -> &[RateFactor] {
        &self.factors
    }
}

/// Base rate before factors: the `events_per_day` option, else the class
/// default.
pub fn base_rate(config: &Config, class_default: f64) -> Result<f64> {
    let rate = config.f64_or(keys::EVENTS_PER_DAY, class_default)?;
    if !rate.is_finite() {
        return Err(ConfigError::InvalidValue {
            field: keys::EVENTS_PER_DAY.to_string(),
            message: format!("Must be finite, got {}", rate),
        }
        .into());
    }
    Ok(validate_non_negative(keys::EVENTS_PER_DAY, rate)?)
}
