//! Property-based tests for bi-math numerical invariants.

use bi_math::{
    bin_index, linspace, normal_cdf, normal_interval_mass, normal_pdf, normal_sf, stable_sum,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn interval_mass_is_probability(
        a in -50.0f64..50.0,
        width in 0.0f64..50.0,
        mu in -10.0f64..10.0,
        sigma in 0.01f64..20.0,
    ) {
        let m = normal_interval_mass(a, a + width, mu, sigma);
        prop_assert!(m.is_finite());
        prop_assert!((0.0..=1.0).contains(&m), "mass={m}");
    }

    #[test]
    fn interval_mass_is_additive(
        a in -8.0f64..8.0,
        w1 in 0.0f64..4.0,
        w2 in 0.0f64..4.0,
        mu in -2.0f64..2.0,
        sigma in 0.1f64..5.0,
    ) {
        let b = a + w1;
        let c = b + w2;
        let whole = normal_interval_mass(a, c, mu, sigma);
        let parts = normal_interval_mass(a, b, mu, sigma) + normal_interval_mass(b, c, mu, sigma);
        prop_assert!((whole - parts).abs() < 1e-12, "whole={whole} parts={parts}");
    }

    #[test]
    fn cdf_is_monotone(x in -30.0f64..30.0, dx in 0.0f64..5.0, sigma in 0.1f64..10.0) {
        prop_assert!(normal_cdf(x, 0.0, sigma) <= normal_cdf(x + dx, 0.0, sigma));
        prop_assert!(normal_sf(x, 0.0, sigma) >= normal_sf(x + dx, 0.0, sigma));
    }

    #[test]
    fn pdf_non_negative_and_finite(x in -1e6f64..1e6, mu in -5.0f64..5.0, sigma in 0.01f64..100.0) {
        let p = normal_pdf(x, mu, sigma);
        prop_assert!(p.is_finite());
        prop_assert!(p >= 0.0);
    }

    #[test]
    fn riemann_sum_of_pdf_matches_mass(mu in -1.0f64..1.0, sigma in 0.5f64..2.0) {
        let edges = linspace(-12.0, 12.0, 4_001);
        let integral = stable_sum(edges.windows(2).map(|w| {
            let mid = 0.5 * (w[0] + w[1]);
            normal_pdf(mid, mu, sigma) * (w[1] - w[0])
        }));
        let mass = normal_interval_mass(-12.0, 12.0, mu, sigma);
        prop_assert!((integral - mass).abs() < 1e-5, "integral={integral} mass={mass}");
    }

    #[test]
    fn every_in_range_point_has_a_bin(x in -10.0f64..=10.0) {
        let edges = linspace(-10.0, 10.0, 100);
        let idx = bin_index(&edges, x);
        prop_assert!(idx.is_some());
        let i = idx.unwrap_or_default();
        prop_assert!(edges[i] <= x && x <= edges[i + 1]);
    }
}
