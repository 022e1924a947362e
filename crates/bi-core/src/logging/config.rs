//! Subscriber settings read from the environment.
//!
//! `BI_LOG` holds `EnvFilter` directives and falls back to `RUST_LOG`;
//! `BI_LOG_FORMAT=json` switches stderr output to JSON lines.

use tracing_subscriber::EnvFilter;

pub const FILTER_ENV: &str = "BI_LOG";
pub const FORMAT_ENV: &str = "BI_LOG_FORMAT";

/// Directives used when neither `BI_LOG` nor `RUST_LOG` is set, or when the
/// given ones do not parse.
pub const DEFAULT_FILTER: &str = "bi_core=info,bi_config=info";

/// How events are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Human,
    /// One JSON object per event, fields flattened.
    Json,
}

impl LogOutput {
    /// `json`/`jsonl` select JSON; anything else is human output.
    fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => LogOutput::Json,
            _ => LogOutput::Human,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directives, e.g. `bi_core=debug`.
    pub filter: String,
    pub output: LogOutput,
    /// Timestamps on human output.
    pub timestamps: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: DEFAULT_FILTER.to_string(),
            output: LogOutput::Human,
            timestamps: true,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let filter = var(FILTER_ENV)
            .or_else(|| var("RUST_LOG"))
            .filter(|directives| !directives.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let output = var(FORMAT_ENV)
            .map(|v| LogOutput::from_env_value(&v))
            .unwrap_or_default();
        LogSettings {
            filter,
            output,
            timestamps: true,
        }
    }

    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = directives.into();
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// The configured filter, or [`DEFAULT_FILTER`] if it does not parse.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        assert_eq!(settings_from(&[]), LogSettings::default());
    }

    #[test]
    fn test_bi_log_wins_over_rust_log() {
        let settings = settings_from(&[("BI_LOG", "bi_core=trace"), ("RUST_LOG", "warn")]);
        assert_eq!(settings.filter, "bi_core=trace");

        let settings = settings_from(&[("RUST_LOG", "bi_config=debug")]);
        assert_eq!(settings.filter, "bi_config=debug");
    }

    #[test]
    fn test_blank_directives_fall_back() {
        assert_eq!(settings_from(&[("BI_LOG", "  ")]).filter, DEFAULT_FILTER);
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(settings_from(&[("BI_LOG_FORMAT", "JSON")]).output, LogOutput::Json);
        assert_eq!(settings_from(&[("BI_LOG_FORMAT", "jsonl")]).output, LogOutput::Json);
        assert_eq!(settings_from(&[("BI_LOG_FORMAT", "pretty")]).output, LogOutput::Human);
    }

    #[test]
    fn test_bad_directives_use_default_filter() {
        let settings = LogSettings::default().with_filter("bi_core=loud");
        assert_eq!(settings.env_filter().to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
    }
}
