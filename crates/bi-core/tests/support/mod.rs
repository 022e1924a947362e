//! Shared fixtures for bi-core integration tests.

#![allow(dead_code)]
// Test support provides more helpers than any single test uses.

use std::path::{Path, PathBuf};

use bi_config::Config;
use bi_math::linspace;
use serde_json::json;

/// The reference Gaussian model: N(0, 1) over 99 bins on [-10, 10].
pub fn base_config() -> Config {
    Config::try_from(json!({
        "mu": 0,
        "sigma": 1,
        "strlen_multiplier": "q",
        "some_multiplier": 1,
        "force_pdf_recalculation": true,
        "analysis_space": [["x", linspace(-10.0, 10.0, 100)]],
        "default_source_class": "GaussianSource",
        "sources": [{"name": "s0"}],
    }))
    .expect("base config is an object")
}

/// Base config with a smaller Monte Carlo sample and caching enabled.
pub fn quick_mc_config() -> Config {
    base_config()
        .with("default_source_class", "GaussianMCSource")
        .with("force_pdf_recalculation", false)
        .with("n_events_for_pdf", 100_000)
        .with("pdf_sampling_batch_size", 25_000)
}

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Relative comparison `|a - b| / |a| <= fraction`.
pub fn almost_equal(a: f64, b: f64, fraction: f64) -> bool {
    bi_math::almost_equal(a, b, fraction)
}

/// Midpoint-rule integral of `f` over 1-D bin `edges`, subdividing each bin.
pub fn integrate_1d(edges: &[f64], f: impl Fn(f64) -> f64) -> f64 {
    const STEPS: usize = 16;
    let mut total = 0.0;
    for w in edges.windows(2) {
        let h = (w[1] - w[0]) / STEPS as f64;
        for k in 0..STEPS {
            total += f(w[0] + (k as f64 + 0.5) * h) * h;
        }
    }
    total
}
