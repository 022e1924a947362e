//! Fuzz target for analysis space construction and bin lookup.
//!
//! Arbitrary edges must be accepted or rejected without panicking, and any
//! accepted space must place every in-range point in a valid bin.

#![no_main]

use arbitrary::Arbitrary;
use bi_core::AnalysisSpace;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    dimensions: Vec<(String, Vec<f64>)>,
    point: Vec<f64>,
}

fuzz_target!(|input: Input| {
    let Ok(space) = AnalysisSpace::new(input.dimensions) else {
        return;
    };
    if space.check_point(&input.point).is_err() {
        return;
    }
    if let Some(flat) = space.bin_of(&input.point) {
        assert!(flat < space.n_bins());
        let indices = space.unravel(flat);
        assert_eq!(space.ravel(&indices), flat);
    }
});
