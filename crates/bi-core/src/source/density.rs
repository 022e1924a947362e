//! Density strategies: closed form or Monte Carlo estimate.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use bi_config::validate::validate_positive_count;
use bi_config::{keys, Config, Fingerprint};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::cache::{CacheEntry, CacheOutcome, DiskStore, PdfCache};
use super::model::{ClosedForm, EventGenerator};
use crate::error::{Error, Result};
use crate::histogram::{Histogram, Interpolation, PdfHistogram};
use crate::logging::{event_names, Stage};
use crate::space::AnalysisSpace;

pub const DEFAULT_N_EVENTS_FOR_PDF: u64 = 1_000_000;
pub const DEFAULT_PDF_SAMPLING_BATCH_SIZE: u64 = 100_000;

/// Mixed into the source seed so PDF estimation and `simulate` draw from
/// different streams.
pub const PDF_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Lifecycle of a source's density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// Constructed, rate bound, no density yet.
    RatesBound,
    /// Generating events for the estimate.
    Simulating,
    /// Histogramming and normalizing.
    Normalizing,
    /// Density available.
    Cached,
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceState::RatesBound => write!(f, "rates_bound"),
            SourceState::Simulating => write!(f, "simulating"),
            SourceState::Normalizing => write!(f, "normalizing"),
            SourceState::Cached => write!(f, "cached"),
        }
    }
}

/// Monte Carlo options read from the source configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct McSettings {
    pub n_events: u64,
    pub batch_size: u64,
    pub interpolation: Interpolation,
    pub force_recalculation: bool,
    pub cache_dir: Option<PathBuf>,
}

impl Default for McSettings {
    fn default() -> Self {
        McSettings {
            n_events: DEFAULT_N_EVENTS_FOR_PDF,
            batch_size: DEFAULT_PDF_SAMPLING_BATCH_SIZE,
            interpolation: Interpolation::default(),
            force_recalculation: false,
            cache_dir: None,
        }
    }
}

impl McSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let n_events = validate_positive_count(
            keys::N_EVENTS_FOR_PDF,
            config.u64_or(keys::N_EVENTS_FOR_PDF, DEFAULT_N_EVENTS_FOR_PDF)?,
        )?;
        let batch_size = validate_positive_count(
            keys::PDF_SAMPLING_BATCH_SIZE,
            config.u64_or(keys::PDF_SAMPLING_BATCH_SIZE, DEFAULT_PDF_SAMPLING_BATCH_SIZE)?,
        )?;
        Ok(McSettings {
            n_events,
            batch_size,
            interpolation: Interpolation::from_config(config)?,
            force_recalculation: config.bool_or(keys::FORCE_PDF_RECALCULATION, false)?,
            cache_dir: config.get_str(keys::CACHE_DIR)?.map(PathBuf::from),
        })
    }
}

/// Simulate `n_events` in batches of `batch_size` from one seeded stream and
/// histogram them over `space`.
///
/// Batches are drawn sequentially from the same RNG, so the result does not
/// depend on `batch_size`.
pub fn estimate(
    generator: &dyn EventGenerator,
    space: &AnalysisSpace,
    n_events: u64,
    batch_size: u64,
    seed: u64,
    mut on_stage: impl FnMut(SourceState),
) -> PdfHistogram {
    let mut rng = StdRng::seed_from_u64(seed ^ PDF_SEED_SALT);
    let mut histogram = Histogram::new(space);

    on_stage(SourceState::Simulating);
    let mut remaining = n_events;
    while remaining > 0 {
        let n = remaining.min(batch_size.max(1));
        let columns = generator.generate(n as usize, &mut rng);
        histogram.fill_columns(space, &columns);
        remaining -= n;
    }

    on_stage(SourceState::Normalizing);
    histogram.normalize()
}

/// Density estimated from simulated events, backed by the PDF cache.
#[derive(Debug)]
pub struct MonteCarloDensity {
    generator: Arc<dyn EventGenerator>,
    settings: McSettings,
    seed: u64,
    fingerprint: Fingerprint,
    descriptor: String,
    cache: Arc<PdfCache>,
    disk: Option<DiskStore>,
    entry: RwLock<Option<Arc<CacheEntry>>>,
    state: Mutex<SourceState>,
}

impl MonteCarloDensity {
    pub fn new(
        generator: Arc<dyn EventGenerator>,
        settings: McSettings,
        seed: u64,
        fingerprint: Fingerprint,
        descriptor: String,
        cache: Arc<PdfCache>,
    ) -> Self {
        let disk = settings.cache_dir.clone().map(DiskStore::new);
        MonteCarloDensity {
            generator,
            settings,
            seed,
            fingerprint,
            descriptor,
            cache,
            disk,
            entry: RwLock::new(None),
            state: Mutex::new(SourceState::RatesBound),
        }
    }

    pub fn settings(&self) -> &McSettings {
        &self.settings
    }

    pub fn state(&self) -> SourceState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SourceState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Look up or estimate the density and bind it to this source.
    pub fn compute(&self, space: &AnalysisSpace, force: bool) -> Result<CacheOutcome> {
        self.bind(space, force).map(|(_, outcome)| outcome)
    }

    /// The bound estimate, computing it on first use.
    pub fn entry(&self, space: &AnalysisSpace) -> Result<Arc<CacheEntry>> {
        if let Some(entry) = self.bound() {
            return Ok(entry);
        }
        self.bind(space, self.settings.force_recalculation)
            .map(|(entry, _)| entry)
    }

    fn bind(&self, space: &AnalysisSpace, force: bool) -> Result<(Arc<CacheEntry>, CacheOutcome)> {
        let started = Instant::now();
        let (entry, outcome) = self.cache.get_or_compute(
            &self.fingerprint,
            &self.descriptor,
            force,
            self.disk.as_ref(),
            || {
                tracing::debug!(
                    event = event_names::PDF_STARTED,
                    stage = %Stage::Simulate,
                    fingerprint = %self.fingerprint.short_id(),
                    n_events = self.settings.n_events,
                    batch_size = self.settings.batch_size,
                    "estimating PDF"
                );
                Ok(estimate(
                    self.generator.as_ref(),
                    space,
                    self.settings.n_events,
                    self.settings.batch_size,
                    self.seed,
                    |stage| self.set_state(stage),
                ))
            },
        )?;

        if !entry.histogram.fits(space) {
            tracing::error!(
                event = event_names::CACHE_INCONSISTENT,
                stage = %Stage::Cache,
                fingerprint = %self.fingerprint.short_id(),
                "cached histogram does not match the analysis space"
            );
            return Err(Error::CacheInconsistency {
                fingerprint: self.fingerprint.to_string(),
                cached: format!("histogram of shape {:?}", entry.histogram.shape()),
                requested: format!("analysis space of shape {:?}", space.shape()),
            });
        }

        if outcome == CacheOutcome::Computed {
            let histogram = &entry.histogram;
            if histogram.fraction_in_range() == 0.0 {
                tracing::warn!(
                    event = event_names::PDF_EMPTY,
                    stage = %Stage::Estimate,
                    fingerprint = %self.fingerprint.short_id(),
                    "no simulated events in the analysis space; density is zero"
                );
            }
            tracing::info!(
                event = event_names::PDF_COMPUTED,
                stage = %Stage::Estimate,
                fingerprint = %self.fingerprint.short_id(),
                n_events = histogram.n_events(),
                fraction_in_range = histogram.fraction_in_range(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "PDF computed"
            );
        }

        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&entry));
        self.set_state(SourceState::Cached);
        Ok((entry, outcome))
    }

    fn bound(&self) -> Option<Arc<CacheEntry>> {
        self.entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// How a source evaluates its density.
#[derive(Debug)]
pub enum DensityStrategy {
    Analytic(Arc<dyn ClosedForm>),
    MonteCarlo(MonteCarloDensity),
}

impl DensityStrategy {
    /// Density at a validated `point`.
    ///
    /// Analytic densities are the closed form everywhere; estimated densities
    /// are 0 outside the analysis space.
    pub fn density(&self, space: &AnalysisSpace, point: &[f64]) -> Result<f64> {
        match self {
            DensityStrategy::Analytic(closed) => Ok(closed.density(point)),
            DensityStrategy::MonteCarlo(mc) => {
                let entry = mc.entry(space)?;
                Ok(entry
                    .histogram
                    .density(space, point, mc.settings.interpolation))
            }
        }
    }

    pub fn fraction_in_range(&self, space: &AnalysisSpace) -> Result<f64> {
        match self {
            DensityStrategy::Analytic(closed) => Ok(closed.fraction_in(space)),
            DensityStrategy::MonteCarlo(mc) => Ok(mc.entry(space)?.histogram.fraction_in_range()),
        }
    }

    /// Row-major `(mass, error)` per bin, masses summing to the fraction in
    /// range. Analytic errors are zero.
    pub fn bin_masses(&self, space: &AnalysisSpace) -> Result<(Vec<f64>, Vec<f64>)> {
        match self {
            DensityStrategy::Analytic(closed) => {
                let masses = closed.bin_masses(space);
                let errors = vec![0.0; masses.len()];
                Ok((masses, errors))
            }
            DensityStrategy::MonteCarlo(mc) => {
                let entry = mc.entry(space)?;
                let h = &entry.histogram;
                let f = h.fraction_in_range();
                Ok((
                    h.masses().iter().map(|m| m * f).collect(),
                    h.errors().iter().map(|e| e * f).collect(),
                ))
            }
        }
    }

    pub fn state(&self) -> SourceState {
        match self {
            DensityStrategy::Analytic(_) => SourceState::Cached,
            DensityStrategy::MonteCarlo(mc) => mc.state(),
        }
    }

    pub fn is_analytic(&self) -> bool {
        matches!(self, DensityStrategy::Analytic(_))
    }
}
