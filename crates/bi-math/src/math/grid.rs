//! Bin-edge helpers shared by histograms and analytic bin masses.
//!
//! Edges are assumed strictly increasing with at least two entries; callers
//! validate that once when the analysis space is parsed.

/// `n` evenly spaced points from `start` to `stop` inclusive (numpy `linspace`).
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the last point so the upper edge is exact.
            out[n - 1] = stop;
            out
        }
    }
}

/// Widths of consecutive bins.
pub fn bin_widths(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Midpoints of consecutive bins.
pub fn bin_centers(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
}

/// Index of the bin containing `x`, or `None` outside `[first, last]`.
///
/// Bins are half-open `[e_i, e_{i+1})` except the last, which also contains
/// its upper edge.
pub fn bin_index(edges: &[f64], x: f64) -> Option<usize> {
    if edges.len() < 2 || !x.is_finite() {
        return None;
    }
    let lo = edges[0];
    let hi = edges[edges.len() - 1];
    if x < lo || x > hi {
        return None;
    }
    let n_bins = edges.len() - 1;
    if x >= hi {
        return Some(n_bins - 1);
    }
    // `k` is the number of edges <= x, so the bin index is k-1.
    let k = edges.partition_point(|e| *e <= x);
    if k == 0 {
        return None;
    }
    Some((k - 1).min(n_bins - 1))
}

/// Bracket `x` between two neighbouring grid points for linear interpolation.
///
/// Returns `(i, t)` such that the interpolant is
/// `(1 - t) * f[i] + t * f[i + 1]`. Points beyond the outermost grid values
/// are clamped (`t` is 0 or 1). A single-point grid always yields `(0, 0.0)`.
pub fn linear_bracket(points: &[f64], x: f64) -> (usize, f64) {
    let n = points.len();
    if n < 2 || x <= points[0] {
        return (0, 0.0);
    }
    if x >= points[n - 1] {
        return (n - 2, 1.0);
    }
    let k = points.partition_point(|p| *p <= x);
    let i = k.saturating_sub(1).min(n - 2);
    let span = points[i + 1] - points[i];
    let t = if span > 0.0 { (x - points[i]) / span } else { 0.0 };
    (i, t.clamp(0.0, 1.0))
}
