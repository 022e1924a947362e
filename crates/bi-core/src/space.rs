//! The binned analysis space.
//!
//! An [`AnalysisSpace`] is an ordered list of dimensions, each with strictly
//! increasing bin edges. Bins are addressed either by per-dimension indices
//! or by a flat row-major index (last dimension fastest), which is the
//! layout used by histograms and PMF grids.

use bi_config::validate::validate_bin_edges;
use bi_config::{keys, Config, ConfigError};
use bi_math::{bin_centers, bin_index, bin_widths};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One named axis of the analysis space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    name: String,
    edges: Vec<f64>,
}

impl Dimension {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn lower(&self) -> f64 {
        self.edges[0]
    }

    pub fn upper(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    pub fn widths(&self) -> Vec<f64> {
        bin_widths(&self.edges)
    }

    pub fn centers(&self) -> Vec<f64> {
        bin_centers(&self.edges)
    }

    /// Bin containing `x`; the upper edge belongs to the last bin.
    pub fn bin_of(&self, x: f64) -> Option<usize> {
        bin_index(&self.edges, x)
    }
}

/// Ordered dimensions with their bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSpace {
    dimensions: Vec<Dimension>,
}

impl AnalysisSpace {
    /// Build from `(name, edges)` pairs.
    ///
    /// Requires at least one dimension, unique names, per dimension at least
    /// two finite, strictly increasing edges, and a total bin count that fits
    /// in `usize`.
    pub fn new<I, S>(dimensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut dims: Vec<Dimension> = Vec::new();
        for (name, edges) in dimensions {
            let name = name.into();
            if name.is_empty() {
                return Err(Error::InvalidAnalysisSpace(
                    "dimension names must be non-empty".to_string(),
                ));
            }
            if dims.iter().any(|d| d.name == name) {
                return Err(Error::InvalidAnalysisSpace(format!(
                    "duplicate dimension '{}'",
                    name
                )));
            }
            validate_bin_edges(&format!("{}.{}", keys::ANALYSIS_SPACE, name), &edges)?;
            dims.push(Dimension { name, edges });
        }
        if dims.is_empty() {
            return Err(Error::InvalidAnalysisSpace(
                "at least one dimension is required".to_string(),
            ));
        }
        dims.iter()
            .try_fold(1usize, |total, d| total.checked_mul(d.n_bins()))
            .ok_or_else(|| {
                Error::InvalidAnalysisSpace(format!(
                    "total bin count of {} dimensions overflows",
                    dims.len()
                ))
            })?;
        Ok(AnalysisSpace { dimensions: dims })
    }

    /// Parse the `analysis_space` option of a source configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let value = config
            .get(keys::ANALYSIS_SPACE)
            .ok_or_else(|| ConfigError::MissingField(keys::ANALYSIS_SPACE.to_string()))?;
        Self::from_value(value)
    }

    /// Parse `[[name, [edges...]], ...]`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = value.as_array().ok_or_else(|| {
            Error::InvalidAnalysisSpace("expected a list of [name, edges] pairs".to_string())
        })?;

        let mut dims = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let pair = match entry.as_array() {
                Some(pair) if pair.len() == 2 => pair,
                _ => {
                    return Err(Error::InvalidAnalysisSpace(format!(
                        "entry {} must be a [name, edges] pair",
                        i
                    )))
                }
            };
            let name = pair[0].as_str().ok_or_else(|| {
                Error::InvalidAnalysisSpace(format!("entry {}: dimension name must be a string", i))
            })?;
            let edges = pair[1]
                .as_array()
                .ok_or_else(|| {
                    Error::InvalidAnalysisSpace(format!("dimension '{}': edges must be a list", name))
                })?
                .iter()
                .map(|e| {
                    e.as_f64().ok_or_else(|| {
                        Error::InvalidAnalysisSpace(format!(
                            "dimension '{}': bin edges must be numbers",
                            name
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            dims.push((name.to_string(), edges));
        }
        Self::new(dims)
    }

    /// Inverse of [`AnalysisSpace::from_value`].
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.dimensions
                .iter()
                .map(|d| serde_json::json!([d.name, d.edges]))
                .collect(),
        )
    }

    pub fn n_dims(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, index: usize) -> Option<&Dimension> {
        self.dimensions.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    /// Bins per dimension.
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::n_bins).collect()
    }

    /// Total number of bins; checked at construction.
    pub fn n_bins(&self) -> usize {
        self.dimensions.iter().map(Dimension::n_bins).product()
    }

    /// Reject points of the wrong arity or with NaN coordinates.
    pub fn check_point(&self, point: &[f64]) -> Result<()> {
        if point.len() != self.n_dims() {
            return Err(Error::DimensionMismatch {
                expected: self.n_dims(),
                got: point.len(),
            });
        }
        for (dim, x) in self.dimensions.iter().zip(point) {
            if x.is_nan() {
                return Err(Error::NonFiniteCoordinate {
                    dimension: dim.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Reorder `(dimension, value)` pairs into analysis-space order.
    pub fn order_point(&self, named: &[(&str, f64)]) -> Result<Vec<f64>> {
        let mut point = vec![f64::NAN; self.n_dims()];
        let mut seen = vec![false; self.n_dims()];
        for (name, x) in named {
            let i = self
                .index_of(name)
                .ok_or_else(|| Error::UnknownDimension(name.to_string()))?;
            point[i] = *x;
            seen[i] = true;
        }
        let got = seen.iter().filter(|s| **s).count();
        if got != self.n_dims() {
            return Err(Error::DimensionMismatch {
                expected: self.n_dims(),
                got,
            });
        }
        Ok(point)
    }

    /// Per-dimension bin indices of `point`, or `None` if outside.
    pub fn bin_indices(&self, point: &[f64]) -> Option<Vec<usize>> {
        self.dimensions
            .iter()
            .zip(point)
            .map(|(d, x)| d.bin_of(*x))
            .collect()
    }

    /// Flat row-major bin index of `point`, or `None` if outside.
    pub fn bin_of(&self, point: &[f64]) -> Option<usize> {
        self.bin_indices(point).map(|idx| self.ravel(&idx))
    }

    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.n_dims() && self.bin_indices(point).is_some()
    }

    /// Flat index of per-dimension indices.
    pub fn ravel(&self, indices: &[usize]) -> usize {
        self.dimensions
            .iter()
            .zip(indices)
            .fold(0, |flat, (d, i)| flat * d.n_bins() + i)
    }

    /// Per-dimension indices of a flat index.
    pub fn unravel(&self, mut flat: usize) -> Vec<usize> {
        let mut indices = vec![0; self.n_dims()];
        for (slot, d) in indices.iter_mut().zip(&self.dimensions).rev() {
            *slot = flat % d.n_bins();
            flat /= d.n_bins();
        }
        indices
    }

    /// Volume of the bin at per-dimension `indices`.
    pub fn bin_volume(&self, indices: &[usize]) -> f64 {
        self.dimensions
            .iter()
            .zip(indices)
            .map(|(d, &i)| d.edges[i + 1] - d.edges[i])
            .product()
    }

    /// Volumes of all bins, row-major.
    pub fn bin_volumes(&self) -> Vec<f64> {
        (0..self.n_bins())
            .map(|flat| self.bin_volume(&self.unravel(flat)))
            .collect()
    }

    /// Volume of the whole space.
    pub fn volume(&self) -> f64 {
        self.dimensions
            .iter()
            .map(|d| d.upper() - d.lower())
            .product()
    }
}
