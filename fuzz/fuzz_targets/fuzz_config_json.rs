//! Fuzz target for model configuration parsing and fingerprinting.
//!
//! Arbitrary JSON must either be rejected with an error or produce a
//! per-source configuration whose fingerprint is stable.

#![no_main]

use bi_config::{Config, HashPolicy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = Config::from_json_str(text) else {
        return;
    };
    let Ok(names) = config.source_names() else {
        return;
    };
    for name in names {
        let Ok(source) = config.for_source(&name) else {
            continue;
        };
        let rate_keys = ["some_multiplier", "strlen_multiplier"];
        let Ok(policy) = HashPolicy::for_config(&source, rate_keys) else {
            continue;
        };
        let (first, _) = policy.fingerprint("GaussianSource", &source);
        let (second, _) = policy.fingerprint("GaussianSource", &source.clone());
        assert_eq!(first, second);
    }
});
