//! Traits at the seam between a source and its distribution.

use std::fmt::Debug;
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::space::AnalysisSpace;

/// Draws events from a distribution.
pub trait EventGenerator: Send + Sync + Debug {
    /// Number of coordinates per event.
    fn n_dims(&self) -> usize;

    /// `n` events as per-dimension columns, each of length `n`.
    fn generate(&self, n: usize, rng: &mut StdRng) -> Vec<Vec<f64>>;
}

/// A distribution with a closed-form density.
pub trait ClosedForm: Send + Sync + Debug {
    /// Density over the whole domain (integrates to 1 there).
    fn density(&self, point: &[f64]) -> f64;

    /// Probability mass inside `space`.
    fn fraction_in(&self, space: &AnalysisSpace) -> f64;

    /// Probability mass of every bin of `space`, row-major. Sums to
    /// `fraction_in(space)`.
    fn bin_masses(&self, space: &AnalysisSpace) -> Vec<f64>;
}

/// What a source class builds from a configuration.
#[derive(Debug, Clone)]
pub enum SourceModel {
    /// Density from the closed form; events from the generator.
    Analytic {
        generator: Arc<dyn EventGenerator>,
        closed_form: Arc<dyn ClosedForm>,
    },
    /// Density estimated by histogramming generated events.
    Simulated { generator: Arc<dyn EventGenerator> },
}

impl SourceModel {
    pub fn generator(&self) -> &Arc<dyn EventGenerator> {
        match self {
            SourceModel::Analytic { generator, .. } | SourceModel::Simulated { generator } => {
                generator
            }
        }
    }

    pub fn is_analytic(&self) -> bool {
        matches!(self, SourceModel::Analytic { .. })
    }
}
