//! Numerically stable primitives for histogram normalization and comparisons.

/// Compensated (Neumaier) summation.
///
/// Histogram normalization sums up to millions of small masses; plain
/// left-to-right accumulation drifts in the last digits, which shows up as
/// cache entries that do not sum to exactly one.
pub fn stable_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0f64;
    let mut compensation = 0.0f64;
    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

/// Ratio that maps a zero or non-finite denominator to 0.
///
/// Used wherever an empty histogram must produce a zero density rather than NaN.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let r = numerator / denominator;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// Relative comparison `|a - b| / |a| <= fraction`.
///
/// When `a` is exactly zero only an exact match is accepted.
pub fn almost_equal(a: f64, b: f64, fraction: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a == b {
        return true;
    }
    if a == 0.0 {
        return false;
    }
    ((a - b) / a).abs() <= fraction
}
