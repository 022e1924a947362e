//! Error types for source construction and density evaluation.
//!
//! Errors carry:
//! - Stable error codes for machine parsing
//! - A category for grouping (configuration, domain, cache, I/O)
//! - A recoverability hint
//!
//! Everything raised at the [`Source`](crate::source::Source) boundary is
//! surfaced unmodified; there is no fallback distribution.

use bi_config::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for blueice core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or invalid parameters, malformed analysis space, unknown class.
    Configuration,
    /// A density queried outside what the source supports.
    Domain,
    /// PDF cache integrity violations.
    Cache,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Domain => write!(f, "domain"),
            ErrorCategory::Cache => write!(f, "cache"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for blueice core.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("malformed analysis space: {0}")]
    InvalidAnalysisSpace(String),

    #[error("unknown source class: {0}")]
    UnknownSourceClass(String),

    #[error("no source class for '{source_name}': set 'class' or 'default_source_class'")]
    NoSourceClass { source_name: String },

    // Domain errors (20-29)
    #[error("point has {got} coordinates but the analysis space has {expected} dimensions")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("coordinate for dimension '{dimension}' is NaN")]
    NonFiniteCoordinate { dimension: String },

    // Cache errors (30-39)
    #[error("fingerprint collision at {fingerprint}: cached descriptor {cached} differs from requested {requested}")]
    CacheInconsistency {
        fingerprint: String,
        cached: String,
        requested: String,
    },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Domain errors
    /// - 30-39: Cache errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidAnalysisSpace(_) => 11,
            Error::UnknownSourceClass(_) => 12,
            Error::NoSourceClass { .. } => 13,
            Error::DimensionMismatch { .. } => 20,
            Error::UnknownDimension(_) => 21,
            Error::NonFiniteCoordinate { .. } => 22,
            Error::CacheInconsistency { .. } => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_)
            | Error::InvalidAnalysisSpace(_)
            | Error::UnknownSourceClass(_)
            | Error::NoSourceClass { .. } => ErrorCategory::Configuration,

            Error::DimensionMismatch { .. }
            | Error::UnknownDimension(_)
            | Error::NonFiniteCoordinate { .. } => ErrorCategory::Domain,

            Error::CacheInconsistency { .. } => ErrorCategory::Cache,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// A cache inconsistency means fingerprinting is broken; nothing the
    /// caller does with the same inputs can fix it.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_)
            | Error::InvalidAnalysisSpace(_)
            | Error::UnknownSourceClass(_)
            | Error::NoSourceClass { .. } => true,

            Error::DimensionMismatch { .. }
            | Error::UnknownDimension(_)
            | Error::NonFiniteCoordinate { .. } => true,

            Error::CacheInconsistency { .. } => false,

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_domain_error(&self) -> bool {
        self.category() == ErrorCategory::Domain
    }
}
