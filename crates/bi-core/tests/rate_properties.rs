//! Property tests for rate binding.

mod support;

use bi_config::Config;
use bi_core::source::{MultiplierRate, RateFactor, RatePolicy};
use bi_core::Source;
use proptest::prelude::*;
use support::{almost_equal, base_config};

fn config_with(some: f64, strlen: &str) -> Config {
    base_config()
        .with("some_multiplier", some)
        .with("strlen_multiplier", strlen)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn rate_is_product_of_factors(
        some in 0.0f64..1e3,
        strlen in "[a-zé]{0,12}",
        base in 0.0f64..1e4,
    ) {
        let config = config_with(some, &strlen).with("events_per_day", base);
        let source = Source::new(&config, "s0").unwrap();
        let expected = base * some * strlen.chars().count() as f64;
        prop_assert!(
            almost_equal(expected, source.events_per_day(), 1e-12),
            "{} vs {}", expected, source.events_per_day()
        );
    }

    #[test]
    fn factor_order_does_not_matter(
        some in 0.01f64..100.0,
        other in 0.01f64..100.0,
        strlen in "[a-z]{1,8}",
        rotate in 0usize..3,
    ) {
        let mut factors = vec![
            RateFactor::numeric("some_multiplier"),
            RateFactor::string_length("strlen_multiplier"),
            RateFactor::numeric("other_multiplier"),
        ];
        let config = config_with(some, &strlen).with("other_multiplier", other);
        let reference = MultiplierRate::new(factors.clone()).bind(&config, 1000.0).unwrap();

        factors.rotate_left(rotate);
        factors.reverse();
        let permuted = MultiplierRate::new(factors).bind(&config, 1000.0).unwrap();
        prop_assert!(almost_equal(reference, permuted, 1e-12));
    }

    #[test]
    fn rate_options_leave_shape_untouched(
        some in 0.0f64..50.0,
        strlen in "[a-z]{0,8}",
    ) {
        let reference = Source::new(&base_config(), "s0").unwrap();
        let scaled = Source::new(&config_with(some, &strlen), "s0").unwrap();
        prop_assert_eq!(reference.fingerprint(), scaled.fingerprint());
        prop_assert_eq!(reference.pdf(&[0.25]).unwrap(), scaled.pdf(&[0.25]).unwrap());
    }
}

#[test]
fn test_negative_multiplier_is_rejected() {
    let err = Source::new(&config_with(-1.0, "q"), "s0").unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_absent_factor_counts_as_one() {
    let config = base_config().without("some_multiplier").without("strlen_multiplier");
    let source = Source::new(&config, "s0").unwrap();
    assert_eq!(source.events_per_day(), 1000.0);
}
