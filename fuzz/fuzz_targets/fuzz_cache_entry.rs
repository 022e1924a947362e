//! Fuzz target for persisted PDF cache entries.
//!
//! Disk entries may be truncated or corrupted; decoding must fail cleanly.

#![no_main]

use bi_core::source::CacheEntry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<CacheEntry>(data);
});
