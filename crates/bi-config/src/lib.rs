//! Blueice source configuration.
//!
//! This crate provides:
//! - The immutable [`Config`] mapping handed to every source
//! - Per-source merging of model-level settings
//! - Config file resolution (CLI → env → XDG → none)
//! - Semantic validation helpers
//! - Canonical fingerprints used as PDF cache keys

pub mod config;
pub mod fingerprint;
pub mod keys;
pub mod resolve;
pub mod validate;

pub use config::Config;
pub use fingerprint::{Fingerprint, HashPolicy};
pub use resolve::{load_config, resolve_config, ConfigPath, ConfigSource};
pub use validate::{ConfigError, ConfigResult};

/// Version of the canonical fingerprint encoding. Bumped when the descriptor
/// layout changes so stale disk caches are never matched.
pub const FINGERPRINT_VERSION: &str = "1";
