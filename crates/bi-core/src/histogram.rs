//! Multi-dimensional histograms and the normalized densities built from them.
//!
//! [`Histogram`] accumulates raw counts over an [`AnalysisSpace`];
//! [`Histogram::normalize`] turns them into a [`PdfHistogram`] whose bin
//! masses sum to 1 (or are all zero when nothing landed in range). The
//! unconditional density at a point is
//! `mass[bin] / volume[bin] * fraction_in_range`, so it integrates to
//! `fraction_in_range` over the space.

use bi_config::{keys, Config, ConfigError};
use bi_math::linear_bracket;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::space::AnalysisSpace;

/// Most dimensions multilinear interpolation accepts; it visits `2^n` corner
/// bins per query.
pub const MAX_LINEAR_DIMS: usize = 16;

/// How a binned density is evaluated between bin centres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Piecewise constant within each bin.
    #[default]
    Nearest,
    /// Multilinear between bin centres, clamped at the outermost centres.
    Linear,
}

impl std::str::FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "linear" => Ok(Interpolation::Linear),
            _ => Err(format!("unknown interpolation method: {}", s)),
        }
    }
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interpolation::Nearest => write!(f, "nearest"),
            Interpolation::Linear => write!(f, "linear"),
        }
    }
}

impl Interpolation {
    /// Reject methods `space` is too large for.
    pub fn check_space(self, space: &AnalysisSpace) -> Result<()> {
        if self == Interpolation::Linear && space.n_dims() > MAX_LINEAR_DIMS {
            return Err(ConfigError::InvalidValue {
                field: keys::PDF_INTERPOLATION_METHOD.to_string(),
                message: format!(
                    "linear interpolation supports at most {} dimensions, the space has {}",
                    MAX_LINEAR_DIMS,
                    space.n_dims()
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Read `pdf_interpolation_method`, defaulting to nearest.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.get_str(keys::PDF_INTERPOLATION_METHOD)? {
            None => Ok(Interpolation::default()),
            Some(s) => s.parse().map_err(|message: String| {
                ConfigError::InvalidValue {
                    field: keys::PDF_INTERPOLATION_METHOD.to_string(),
                    message,
                }
                .into()
            }),
        }
    }
}

/// Raw event counts over an analysis space.
#[derive(Debug, Clone)]
pub struct Histogram {
    shape: Vec<usize>,
    counts: Vec<u64>,
    n_total: u64,
    n_in_range: u64,
}

impl Histogram {
    pub fn new(space: &AnalysisSpace) -> Self {
        Histogram {
            shape: space.shape(),
            counts: vec![0; space.n_bins()],
            n_total: 0,
            n_in_range: 0,
        }
    }

    /// Count one event. Events outside the space only increase the total.
    pub fn fill(&mut self, space: &AnalysisSpace, point: &[f64]) {
        self.n_total += 1;
        if let Some(bin) = space.bin_of(point) {
            self.counts[bin] += 1;
            self.n_in_range += 1;
        }
    }

    /// Count events given as per-dimension columns.
    pub fn fill_columns(&mut self, space: &AnalysisSpace, columns: &[Vec<f64>]) {
        let n = columns.iter().map(Vec::len).min().unwrap_or(0);
        let mut point = vec![0.0; columns.len()];
        for i in 0..n {
            for (slot, column) in point.iter_mut().zip(columns) {
                *slot = column[i];
            }
            self.fill(space, &point);
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn n_total(&self) -> u64 {
        self.n_total
    }

    pub fn n_in_range(&self) -> u64 {
        self.n_in_range
    }

    /// Bin masses summing to 1, per-bin errors `sqrt(count) / n_in_range`,
    /// and `fraction_in_range = n_in_range / n_total`.
    pub fn normalize(&self) -> PdfHistogram {
        let (masses, errors) = if self.n_in_range == 0 {
            (vec![0.0; self.counts.len()], vec![0.0; self.counts.len()])
        } else {
            let n = self.n_in_range as f64;
            self.counts
                .iter()
                .map(|&c| (c as f64 / n, (c as f64).sqrt() / n))
                .unzip()
        };
        let fraction_in_range = if self.n_total == 0 {
            0.0
        } else {
            self.n_in_range as f64 / self.n_total as f64
        };
        PdfHistogram {
            shape: self.shape.clone(),
            masses,
            errors,
            fraction_in_range,
            n_events: self.n_total,
        }
    }
}

/// A normalized binned density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfHistogram {
    shape: Vec<usize>,
    masses: Vec<f64>,
    errors: Vec<f64>,
    fraction_in_range: f64,
    n_events: u64,
}

impl PdfHistogram {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major bin masses; sum to 1 unless nothing landed in range.
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Row-major statistical errors on the masses.
    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    pub fn fraction_in_range(&self) -> f64 {
        self.fraction_in_range
    }

    /// Number of simulated events this estimate is based on.
    pub fn n_events(&self) -> u64 {
        self.n_events
    }

    /// Whether this histogram was built over a space with `space`'s binning.
    pub fn fits(&self, space: &AnalysisSpace) -> bool {
        self.shape == space.shape()
            && self.masses.len() == space.n_bins()
            && self.errors.len() == self.masses.len()
    }

    /// Unconditional density of the bin at per-dimension `indices`.
    pub fn bin_density(&self, space: &AnalysisSpace, indices: &[usize]) -> f64 {
        let volume = space.bin_volume(indices);
        let mass = self.masses[space.ravel(indices)];
        bi_math::safe_ratio(mass, volume) * self.fraction_in_range
    }

    /// Density at `point`; 0 outside the space. The point must already have
    /// the space's arity. Spaces above [`MAX_LINEAR_DIMS`] are always read
    /// bin by bin.
    pub fn density(&self, space: &AnalysisSpace, point: &[f64], method: Interpolation) -> f64 {
        let Some(indices) = space.bin_indices(point) else {
            return 0.0;
        };
        match method {
            Interpolation::Linear if space.n_dims() <= MAX_LINEAR_DIMS => {
                self.multilinear(space, point)
            }
            _ => self.bin_density(space, &indices),
        }
    }

    fn multilinear(&self, space: &AnalysisSpace, point: &[f64]) -> f64 {
        let brackets: Vec<(usize, f64)> = space
            .dimensions()
            .iter()
            .zip(point)
            .map(|(d, x)| linear_bracket(&d.centers(), *x))
            .collect();

        let mut total = 0.0;
        let mut corner_idx = vec![0usize; brackets.len()];
        for corner in 0..(1usize << brackets.len()) {
            let mut weight = 1.0;
            for (k, &(i, t)) in brackets.iter().enumerate() {
                if (corner >> k) & 1 == 1 {
                    weight *= t;
                    corner_idx[k] = i + 1;
                } else {
                    weight *= 1.0 - t;
                    corner_idx[k] = i;
                }
            }
            // Zero-weight corners may index past a single-bin axis.
            if weight == 0.0 {
                continue;
            }
            total += weight * self.bin_density(space, &corner_idx);
        }
        total
    }
}
