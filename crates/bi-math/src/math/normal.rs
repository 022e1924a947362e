//! Normal distribution utilities for analytic sources.
//!
//! Parameterization is location/scale: `N(mu, sigma)` with `sigma > 0`.
//! Invalid parameters propagate as NaN so callers can validate once at the
//! boundary instead of threading `Result` through inner loops.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;

/// Natural log of `sqrt(2π)`.
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

fn invalid_params(mu: f64, sigma: f64) -> bool {
    mu.is_nan() || sigma.is_nan() || !sigma.is_finite() || sigma <= 0.0
}

/// Log-PDF of `N(mu, sigma)` at `x`.
///
/// `log p(x) = -0.5 * ((x-mu)/sigma)^2 - ln(sigma) - ln(sqrt(2π))`
pub fn normal_log_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if x.is_nan() || invalid_params(mu, sigma) {
        return f64::NAN;
    }
    if x.is_infinite() {
        return f64::NEG_INFINITY;
    }
    let z = (x - mu) / sigma;
    -0.5 * z * z - sigma.ln() - LN_SQRT_2PI
}

/// PDF of `N(mu, sigma)` at `x`.
pub fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let log_pdf = normal_log_pdf(x, mu, sigma);
    if log_pdf.is_nan() {
        return f64::NAN;
    }
    if log_pdf == f64::NEG_INFINITY {
        return 0.0;
    }
    log_pdf.exp()
}

/// CDF of the standard normal, `Φ(z)`.
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// CDF of `N(mu, sigma)` at `x`.
pub fn normal_cdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if x.is_nan() || invalid_params(mu, sigma) {
        return f64::NAN;
    }
    standard_normal_cdf((x - mu) / sigma)
}

/// Survival function `1 - CDF` of `N(mu, sigma)` at `x`.
///
/// Evaluated directly from `erfc` so the upper tail keeps full precision.
pub fn normal_sf(x: f64, mu: f64, sigma: f64) -> f64 {
    if x.is_nan() || invalid_params(mu, sigma) {
        return f64::NAN;
    }
    0.5 * erfc((x - mu) / (sigma * SQRT_2))
}

/// Probability mass of `N(mu, sigma)` inside `[a, b]`.
///
/// Picks the tail that avoids catastrophic cancellation: for intervals above
/// the mean the difference of survival functions is used.
pub fn normal_interval_mass(a: f64, b: f64, mu: f64, sigma: f64) -> f64 {
    if a.is_nan() || b.is_nan() || invalid_params(mu, sigma) {
        return f64::NAN;
    }
    if a >= b {
        return 0.0;
    }
    let mass = if a > mu {
        normal_sf(a, mu, sigma) - normal_sf(b, mu, sigma)
    } else {
        normal_cdf(b, mu, sigma) - normal_cdf(a, mu, sigma)
    };
    mass.clamp(0.0, 1.0)
}
