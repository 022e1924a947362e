//! Structured event vocabulary.
//!
//! Every log line emitted by this crate carries an `event` field from
//! [`event_names`] and a `stage` field from [`Stage`], so JSONL output can be
//! filtered without parsing messages.

use serde::{Deserialize, Serialize};

/// Where in a source's lifecycle an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Configuration merge, class resolution, rate binding.
    Construct,
    /// Event generation.
    Simulate,
    /// Histogramming and normalization.
    Estimate,
    /// PDF cache lookups and stores.
    Cache,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Construct => "construct",
            Stage::Simulate => "simulate",
            Stage::Estimate => "estimate",
            Stage::Cache => "cache",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Construction
    pub const SOURCE_CONSTRUCTED: &str = "source.constructed";
    pub const CLASS_REGISTERED: &str = "registry.class_registered";

    // Estimation
    pub const PDF_STARTED: &str = "pdf.started";
    pub const PDF_COMPUTED: &str = "pdf.computed";
    pub const PDF_EMPTY: &str = "pdf.empty";

    // Cache
    pub const CACHE_HIT: &str = "cache.hit";
    pub const CACHE_MISS: &str = "cache.miss";
    pub const CACHE_FORCED: &str = "cache.forced";
    pub const CACHE_DISK_HIT: &str = "cache.disk_hit";
    pub const CACHE_DISK_READ_FAILED: &str = "cache.disk_read_failed";
    pub const CACHE_DISK_WRITE_FAILED: &str = "cache.disk_write_failed";
    pub const CACHE_INCONSISTENT: &str = "cache.inconsistent";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        assert_eq!(
            serde_json::to_string(&Stage::Construct).unwrap(),
            "\"construct\""
        );
        assert_eq!(serde_json::to_string(&Stage::Cache).unwrap(), "\"cache\"");
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [Stage::Construct, Stage::Simulate, Stage::Estimate, Stage::Cache] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json.trim_matches('"'), stage.to_string());
        }
    }

    #[test]
    fn test_event_names_are_namespaced() {
        for name in [
            event_names::SOURCE_CONSTRUCTED,
            event_names::PDF_COMPUTED,
            event_names::CACHE_HIT,
            event_names::CACHE_DISK_WRITE_FAILED,
        ] {
            assert!(name.contains('.'), "{name}");
        }
    }
}
