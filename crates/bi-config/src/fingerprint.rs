//! Canonical configuration fingerprints.
//!
//! A fingerprint is the SHA-256 of a canonical JSON descriptor
//! `{"class": .., "config": .., "version": ..}` where `config` is the subset
//! of options that can change a simulated distribution. Canonical JSON sorts
//! object keys, omits whitespace, and writes integral floats as integers, so
//! `{"mu": 1}` and `{"mu": 1.0}` fingerprint identically.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::keys;
use crate::validate::ConfigResult;

/// Options that never affect a simulated distribution.
///
/// Rates and exposures scale a source but not its shape; the class enters the
/// descriptor separately, already resolved; the rest are bookkeeping.
pub const DEFAULT_DONT_HASH: &[&str] = &[
    keys::NAME,
    keys::LABEL,
    keys::COLOR,
    keys::SOURCES,
    keys::CLASS,
    keys::DEFAULT_SOURCE_CLASS,
    keys::FORCE_PDF_RECALCULATION,
    keys::DELAY_PDF_COMPUTATION,
    keys::CACHE_DIR,
    keys::DONT_HASH_SETTINGS,
    keys::EXTRA_DONT_HASH_SETTINGS,
    keys::EVENTS_PER_DAY,
    keys::LIVETIME_DAYS,
    keys::PDF_SAMPLING_BATCH_SIZE,
    keys::PDF_INTERPOLATION_METHOD,
];

/// Hex SHA-256 digest of a canonical descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of arbitrary canonical content.
    pub fn of(content: &str) -> Self {
        Fingerprint(hash_content(content))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short identifier for logs (first 12 hex chars).
    pub fn short_id(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }

    /// First eight digest bytes as a seed for reproducible simulation.
    pub fn seed(&self) -> u64 {
        let mut seed = 0u64;
        for (i, b) in hex::decode(&self.0[..16.min(self.0.len())])
            .unwrap_or_default()
            .iter()
            .enumerate()
        {
            seed |= (*b as u64) << (8 * i);
        }
        seed
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which options participate in a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPolicy {
    excluded: BTreeSet<String>,
}

impl Default for HashPolicy {
    fn default() -> Self {
        HashPolicy {
            excluded: DEFAULT_DONT_HASH.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl HashPolicy {
    /// Default exclusions plus `extra` plus the config's own
    /// `extra_dont_hash_settings`.
    pub fn for_config<'a, I>(config: &Config, extra: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut policy = HashPolicy::default();
        policy.excluded.extend(extra.into_iter().map(str::to_string));
        policy
            .excluded
            .extend(config.get_str_list(keys::EXTRA_DONT_HASH_SETTINGS)?);
        Ok(policy)
    }

    pub fn is_hashed(&self, key: &str) -> bool {
        !self.excluded.contains(key)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    /// Canonical descriptor text for `class` under `config`.
    pub fn descriptor(&self, class: &str, config: &Config) -> String {
        let hashed: Map<String, Value> = config
            .as_map()
            .iter()
            .filter(|(k, v)| self.is_hashed(k) && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut root = Map::new();
        root.insert("class".to_string(), Value::String(class.to_string()));
        root.insert("config".to_string(), Value::Object(hashed));
        root.insert(
            "version".to_string(),
            Value::String(crate::FINGERPRINT_VERSION.to_string()),
        );
        canonical_json(&Value::Object(root))
    }

    /// Fingerprint and the descriptor it was computed from.
    pub fn fingerprint(&self, class: &str, config: &Config) -> (Fingerprint, String) {
        let descriptor = self.descriptor(class, config);
        (Fingerprint::of(&descriptor), descriptor)
    }
}

/// Serialize `value` canonically: sorted keys, no whitespace, integral
/// floats as integers, other floats in shortest round-trip form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let _ = write!(out, "{}", i);
            } else if let Some(u) = n.as_u64() {
                let _ = write!(out, "{}", u);
            } else if let Some(f) = n.as_f64() {
                write_float(f, out);
            } else {
                let _ = write!(out, "{}", n);
            }
        }
        Value::String(s) => {
            // serde_json string escaping is deterministic.
            out.push_str(&Value::String(s.clone()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
    }
}

fn write_float(f: f64, out: &mut String) {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;
    if f == 0.0 {
        // -0.0 and 0.0 describe the same distribution.
        out.push('0');
    } else if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        let _ = write!(out, "{}", f as i64);
    } else {
        let _ = write!(out, "{:?}", f);
    }
}

/// Hash content with SHA-256 and return hex string.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg(v: Value) -> Config {
        Config::try_from(v).unwrap()
    }

    #[test]
    fn test_hash_content() {
        let hash1 = hash_content("test");
        let hash2 = hash_content("test");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_canonical_sorts_keys() {
        let a = canonical_json(&json!({"b": 1, "a": {"d": 2, "c": 3}}));
        assert_eq!(a, r#"{"a":{"c":3,"d":2},"b":1}"#);
    }

    #[test]
    fn test_canonical_integral_floats() {
        assert_eq!(canonical_json(&json!(1.0)), "1");
        assert_eq!(canonical_json(&json!(1)), "1");
        assert_eq!(canonical_json(&json!(-0.0)), "0");
        assert_eq!(canonical_json(&json!(0.1)), "0.1");
        assert_eq!(canonical_json(&json!(1e300)), "1e300");
    }

    #[test]
    fn test_int_and_float_configs_match() {
        let policy = HashPolicy::default();
        let (a, _) = policy.fingerprint("G", &cfg(json!({"mu": 0, "sigma": 1})));
        let (b, _) = policy.fingerprint("G", &cfg(json!({"sigma": 1.0, "mu": 0.0})));
        assert_eq!(a, b);
    }

    #[test]
    fn test_cosmetic_keys_ignored() {
        let policy = HashPolicy::default();
        let (a, _) = policy.fingerprint("G", &cfg(json!({"mu": 0, "label": "signal"})));
        let (b, _) = policy.fingerprint("G", &cfg(json!({"mu": 0, "label": "other"})));
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_keys_change_fingerprint() {
        let policy = HashPolicy::default();
        let (a, _) = policy.fingerprint("G", &cfg(json!({"mu": 0, "sigma": 1})));
        let (b, _) = policy.fingerprint("G", &cfg(json!({"mu": 0, "sigma": 2})));
        let (c, _) = policy.fingerprint("G", &cfg(json!({"mu": 1, "sigma": 1})));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_class_changes_fingerprint() {
        let policy = HashPolicy::default();
        let config = cfg(json!({"mu": 0}));
        assert_ne!(policy.fingerprint("A", &config).0, policy.fingerprint("B", &config).0);
    }

    #[test]
    fn test_extra_dont_hash_settings() {
        let a = cfg(json!({"mu": 0, "tag": "a", "extra_dont_hash_settings": ["tag"]}));
        let b = cfg(json!({"mu": 0, "tag": "b", "extra_dont_hash_settings": ["tag"]}));
        let pa = HashPolicy::for_config(&a, []).unwrap();
        let pb = HashPolicy::for_config(&b, []).unwrap();
        assert_eq!(pa.fingerprint("G", &a).0, pb.fingerprint("G", &b).0);
    }

    #[test]
    fn test_rate_keys_passed_as_extra() {
        let a = cfg(json!({"mu": 0, "some_multiplier": 1}));
        let b = cfg(json!({"mu": 0, "some_multiplier": 3}));
        let policy = HashPolicy::for_config(&a, ["some_multiplier"]).unwrap();
        assert!(!policy.is_hashed("some_multiplier"));
        assert_eq!(policy.fingerprint("G", &a).0, policy.fingerprint("G", &b).0);
    }

    #[test]
    fn test_short_id_and_seed() {
        let fp = Fingerprint::of("content");
        assert_eq!(fp.short_id().len(), 12);
        assert_eq!(fp.seed(), Fingerprint::of("content").seed());
        assert_ne!(fp.seed(), Fingerprint::of("other").seed());
    }
}
