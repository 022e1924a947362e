//! Independent normal distribution along every analysis dimension.

use bi_config::validate::{validate_finite, validate_positive};
use bi_config::{keys, Config, ConfigError};
use bi_math::{normal_interval_mass, normal_pdf};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use super::model::{ClosedForm, EventGenerator};
use crate::error::Result;
use crate::space::AnalysisSpace;

/// Base rate of the Gaussian classes when `events_per_day` is not set.
pub const GAUSSIAN_EVENTS_PER_DAY: f64 = 1000.0;
pub const DEFAULT_SIGMA: f64 = 1.0;

/// Product of per-dimension normals `N(mu_d, sigma_d)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianModel {
    mu: Vec<f64>,
    sigma: Vec<f64>,
}

impl GaussianModel {
    /// Validate `mu` (required) and `sigma` (default 1). Each may be a scalar,
    /// applied to every dimension, or a list with one value per dimension.
    pub fn from_config(config: &Config, n_dims: usize) -> Result<Self> {
        let mu = config
            .get_f64_or_list(keys::MU)?
            .ok_or_else(|| ConfigError::MissingField(keys::MU.to_string()))?;
        let sigma = config
            .get_f64_or_list(keys::SIGMA)?
            .unwrap_or_else(|| vec![DEFAULT_SIGMA]);

        let mu = broadcast(keys::MU, mu, n_dims)?;
        let sigma = broadcast(keys::SIGMA, sigma, n_dims)?;
        for m in &mu {
            validate_finite(keys::MU, *m)?;
        }
        for s in &sigma {
            validate_finite(keys::SIGMA, *s)?;
            validate_positive(keys::SIGMA, *s)?;
        }
        Ok(GaussianModel { mu, sigma })
    }

    pub fn mu(&self) -> &[f64] {
        &self.mu
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    fn interval_masses(&self, space: &AnalysisSpace) -> Vec<Vec<f64>> {
        space
            .dimensions()
            .iter()
            .zip(self.mu.iter().zip(&self.sigma))
            .map(|(d, (&mu, &sigma))| {
                d.edges()
                    .windows(2)
                    .map(|w| normal_interval_mass(w[0], w[1], mu, sigma))
                    .collect()
            })
            .collect()
    }
}

fn broadcast(field: &str, values: Vec<f64>, n_dims: usize) -> Result<Vec<f64>> {
    match values.len() {
        1 => Ok(vec![values[0]; n_dims]),
        n if n == n_dims => Ok(values),
        n => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!(
                "Expected a scalar or {} values (one per dimension), got {}",
                n_dims, n
            ),
        }
        .into()),
    }
}

impl EventGenerator for GaussianModel {
    fn n_dims(&self) -> usize {
        self.mu.len()
    }

    fn generate(&self, n: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
        let mut columns: Vec<Vec<f64>> = self.mu.iter().map(|_| Vec::with_capacity(n)).collect();
        // Event-major so each event's coordinates are consecutive draws.
        for _ in 0..n {
            for (column, (mu, sigma)) in columns.iter_mut().zip(self.mu.iter().zip(&self.sigma)) {
                let z: f64 = rng.sample(StandardNormal);
                column.push(mu + sigma * z);
            }
        }
        columns
    }
}

impl ClosedForm for GaussianModel {
    fn density(&self, point: &[f64]) -> f64 {
        point
            .iter()
            .zip(self.mu.iter().zip(&self.sigma))
            .map(|(&x, (&mu, &sigma))| normal_pdf(x, mu, sigma))
            .product()
    }

    fn fraction_in(&self, space: &AnalysisSpace) -> f64 {
        space
            .dimensions()
            .iter()
            .zip(self.mu.iter().zip(&self.sigma))
            .map(|(d, (&mu, &sigma))| normal_interval_mass(d.lower(), d.upper(), mu, sigma))
            .product()
    }

    fn bin_masses(&self, space: &AnalysisSpace) -> Vec<f64> {
        let per_dim = self.interval_masses(space);
        (0..space.n_bins())
            .map(|flat| {
                space
                    .unravel(flat)
                    .iter()
                    .zip(&per_dim)
                    .map(|(&i, masses)| masses[i])
                    .product()
            })
            .collect()
    }
}
