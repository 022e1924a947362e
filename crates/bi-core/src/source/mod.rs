//! Sources: a rate policy, a density strategy and an event generator bound
//! to one configuration and analysis space.
//!
//! ```ignore
//! use bi_config::Config;
//! use bi_core::Source;
//!
//! let config = Config::from_json_str(r#"{
//!     "mu": 0, "sigma": 1,
//!     "default_source_class": "GaussianMCSource",
//!     "analysis_space": [["x", [-3, -1, 0, 1, 3]]]
//! }"#)?;
//! let source = Source::new(&config, "signal")?;
//! let density = source.pdf(&[0.2])?;
//! let events = source.simulate(100);
//! ```

pub mod cache;
pub mod density;
pub mod gaussian;
pub mod model;
pub mod rate;
pub mod registry;

use std::sync::{Arc, Mutex, PoisonError};

use bi_config::validate::validate_non_negative;
use bi_config::{keys, Config, ConfigError, Fingerprint, HashPolicy};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::batch::{EventBatch, SourceTag};
use crate::error::{Error, Result};
use crate::logging::{event_names, Stage};
use crate::space::AnalysisSpace;

pub use cache::{CacheEntry, CacheOutcome, CacheStats, DiskStore, PdfCache};
pub use density::{DensityStrategy, McSettings, MonteCarloDensity, SourceState};
pub use gaussian::GaussianModel;
pub use model::{ClosedForm, EventGenerator, SourceModel};
pub use rate::{MultiplierRate, RateFactor, RatePolicy};
pub use registry::{SourceClass, SourceRegistry, GAUSSIAN_MC_SOURCE, GAUSSIAN_SOURCE};

/// Per-bin expected event counts over the analysis space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmfGrid {
    pub shape: Vec<usize>,
    /// Row-major expected counts over the source's livetime.
    pub expected: Vec<f64>,
    /// Row-major absolute Monte Carlo errors on `expected` (zero for analytic
    /// sources).
    pub errors: Vec<f64>,
}

impl PmfGrid {
    /// Expected events in the whole analysis space.
    pub fn total(&self) -> f64 {
        bi_math::stable_sum(self.expected.iter().copied())
    }
}

/// A configured source of events.
#[derive(Debug)]
pub struct Source {
    name: String,
    tag: SourceTag,
    class: String,
    config: Arc<Config>,
    space: Arc<AnalysisSpace>,
    events_per_day: f64,
    livetime_days: f64,
    rate_policy: Arc<dyn RatePolicy>,
    generator: Arc<dyn EventGenerator>,
    density: DensityStrategy,
    fingerprint: Fingerprint,
    descriptor: String,
    seed: u64,
    rng: Mutex<StdRng>,
}

impl Source {
    /// Build source `name` from a model-level configuration using the
    /// built-in classes and a private cache.
    pub fn new(config: &Config, name: &str) -> Result<Self> {
        SourceRegistry::with_builtin().build(config, name)
    }

    /// Build from an already merged per-source configuration.
    pub fn from_class(
        class: &SourceClass,
        config: Config,
        tag: usize,
        cache: Arc<PdfCache>,
    ) -> Result<Self> {
        let tag = u32::try_from(tag).map(SourceTag).map_err(|_| ConfigError::InvalidValue {
            field: keys::SOURCES.to_string(),
            message: format!("source index {} does not fit a source tag", tag),
        })?;
        let space = AnalysisSpace::from_config(&config)?;

        let base = rate::base_rate(&config, class.default_events_per_day())?;
        let rate_policy = Arc::clone(class.rate_policy());
        let events_per_day = rate_policy.bind(&config, base)?;

        let livetime_days = config.f64_or(keys::LIVETIME_DAYS, 1.0)?;
        if !livetime_days.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: keys::LIVETIME_DAYS.to_string(),
                message: format!("Must be finite, got {}", livetime_days),
            }
            .into());
        }
        validate_non_negative(keys::LIVETIME_DAYS, livetime_days)?;

        let model = class.build_model(&config, &space)?;
        let generator = Arc::clone(model.generator());
        if generator.n_dims() != space.n_dims() {
            return Err(Error::InvalidAnalysisSpace(format!(
                "class {} generates {}-dimensional events but the space has {} dimensions",
                class.name(),
                generator.n_dims(),
                space.n_dims()
            )));
        }

        let policy = HashPolicy::for_config(&config, rate_policy.keys())?;
        let resolved = config.or_defaults(class.defaults());
        let (fingerprint, descriptor) = policy.fingerprint(class.name(), &resolved);
        let seed = config.get_u64(keys::SEED)?.unwrap_or_else(|| fingerprint.seed());

        let density = match model {
            SourceModel::Analytic { closed_form, .. } => DensityStrategy::Analytic(closed_form),
            SourceModel::Simulated { generator } => {
                let settings = McSettings::from_config(&config)?;
                settings.interpolation.check_space(&space)?;
                DensityStrategy::MonteCarlo(MonteCarloDensity::new(
                    generator,
                    settings,
                    seed,
                    fingerprint.clone(),
                    descriptor.clone(),
                    cache,
                ))
            }
        };
        let delay = config.bool_or(keys::DELAY_PDF_COMPUTATION, false)?;

        let source = Source {
            name: config.get_str(keys::NAME)?.unwrap_or_default().to_string(),
            tag,
            class: class.name().to_string(),
            config: Arc::new(config),
            space: Arc::new(space),
            events_per_day,
            livetime_days,
            rate_policy,
            generator,
            density,
            fingerprint,
            descriptor,
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        };

        tracing::debug!(
            event = event_names::SOURCE_CONSTRUCTED,
            stage = %Stage::Construct,
            source = %source.name,
            class = %source.class,
            events_per_day = source.events_per_day,
            fingerprint = %source.fingerprint.short_id(),
            "source constructed"
        );

        if !source.density.is_analytic() && !delay {
            source.compute_pdf()?;
        }
        Ok(source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> SourceTag {
        self.tag
    }

    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// The merged per-source configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn analysis_space(&self) -> &AnalysisSpace {
        &self.space
    }

    pub fn events_per_day(&self) -> f64 {
        self.events_per_day
    }

    pub fn livetime_days(&self) -> f64 {
        self.livetime_days
    }

    pub fn rate_policy(&self) -> &dyn RatePolicy {
        self.rate_policy.as_ref()
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Canonical text the fingerprint was computed from.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> SourceState {
        self.density.state()
    }

    pub fn is_analytic(&self) -> bool {
        self.density.is_analytic()
    }

    /// Density at `point` (one coordinate per dimension, in analysis-space
    /// order).
    pub fn pdf(&self, point: &[f64]) -> Result<f64> {
        self.space.check_point(point)?;
        self.density.density(&self.space, point)
    }

    /// Density at a point given as `(dimension, value)` pairs.
    pub fn pdf_named(&self, point: &[(&str, f64)]) -> Result<f64> {
        let ordered = self.space.order_point(point)?;
        self.pdf(&ordered)
    }

    /// Density at every event of `batch`, matched to dimensions by name.
    pub fn pdf_events(&self, batch: &EventBatch) -> Result<Vec<f64>> {
        let columns = self
            .space
            .names()
            .map(|name| {
                batch
                    .column(name)
                    .ok_or_else(|| Error::UnknownDimension(name.to_string()))
            })
            .collect::<Result<Vec<&[f64]>>>()?;

        let mut point = vec![0.0; columns.len()];
        (0..batch.len())
            .map(|i| {
                for (slot, column) in point.iter_mut().zip(&columns) {
                    *slot = column[i];
                }
                self.pdf(&point)
            })
            .collect()
    }

    /// Draw `n` events. Successive calls continue one seeded stream, so two
    /// sources with the same configuration yield the same batches.
    pub fn simulate(&self, n: usize) -> EventBatch {
        let names: Vec<String> = self.space.names().map(str::to_string).collect();
        if n == 0 {
            return EventBatch::new(names);
        }
        let columns = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            self.generator.generate(n, &mut rng)
        };
        EventBatch::from_columns(names, columns, self.tag)
    }

    /// Bind the density, honouring `force_pdf_recalculation`. `None` for
    /// analytic sources.
    pub fn compute_pdf(&self) -> Result<Option<CacheOutcome>> {
        match &self.density {
            DensityStrategy::Analytic(_) => Ok(None),
            DensityStrategy::MonteCarlo(mc) => mc
                .compute(&self.space, mc.settings().force_recalculation)
                .map(Some),
        }
    }

    /// Recompute the density, bypassing and then replacing the cache entry.
    pub fn force_compute_pdf(&self) -> Result<Option<CacheOutcome>> {
        match &self.density {
            DensityStrategy::Analytic(_) => Ok(None),
            DensityStrategy::MonteCarlo(mc) => mc.compute(&self.space, true).map(Some),
        }
    }

    /// Probability that an event lands in the analysis space.
    pub fn fraction_in_range(&self) -> Result<f64> {
        self.density.fraction_in_range(&self.space)
    }

    /// `events_per_day * livetime_days * fraction_in_range`.
    pub fn expected_events(&self) -> Result<f64> {
        Ok(self.events_per_day * self.livetime_days * self.fraction_in_range()?)
    }

    /// Probability mass per bin, row-major; sums to `fraction_in_range`.
    pub fn bin_masses(&self) -> Result<Vec<f64>> {
        self.density.bin_masses(&self.space).map(|(masses, _)| masses)
    }

    /// Expected counts per bin over the livetime.
    pub fn pmf_grid(&self) -> Result<PmfGrid> {
        let (masses, errors) = self.density.bin_masses(&self.space)?;
        let scale = self.events_per_day * self.livetime_days;
        Ok(PmfGrid {
            shape: self.space.shape(),
            expected: masses.iter().map(|m| m * scale).collect(),
            errors: errors.iter().map(|e| e * scale).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bi_math::linspace;
    use serde_json::json;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn config(class: &str) -> Config {
        Config::try_from(json!({
            "mu": 0,
            "sigma": 1,
            "default_source_class": class,
            "analysis_space": [["x", linspace(-5.0, 5.0, 41)]],
            "n_events_for_pdf": 50_000,
        }))
        .unwrap()
    }

    #[test]
    fn test_source_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Source>();
    }

    #[test]
    fn test_analytic_basics() {
        let source = Source::new(&config(GAUSSIAN_SOURCE), "s").unwrap();
        assert_eq!(source.name(), "s");
        assert_eq!(source.events_per_day(), 1000.0);
        assert_eq!(source.state(), SourceState::Cached);
        assert_eq!(source.compute_pdf().unwrap(), None);
        assert!(approx_eq(source.pdf(&[0.0]).unwrap(), 0.398_942_280_401_432_7, 1e-12));
    }

    #[test]
    fn test_pdf_domain_errors() {
        let source = Source::new(&config(GAUSSIAN_SOURCE), "s").unwrap();
        assert!(source.pdf(&[0.0, 1.0]).unwrap_err().is_domain_error());
        assert!(source.pdf(&[]).unwrap_err().is_domain_error());
        assert!(source.pdf_named(&[("y", 0.0)]).unwrap_err().is_domain_error());
        assert!(source.pdf(&[f64::NAN]).unwrap_err().is_domain_error());
        assert!(approx_eq(
            source.pdf_named(&[("x", 1.0)]).unwrap(),
            source.pdf(&[1.0]).unwrap(),
            0.0
        ));
    }

    #[test]
    fn test_mc_lifecycle() {
        let source = Source::new(&config(GAUSSIAN_MC_SOURCE), "s").unwrap();
        assert_eq!(source.state(), SourceState::Cached);
        assert_eq!(source.compute_pdf().unwrap(), Some(CacheOutcome::Hit));
        assert_eq!(
            source.force_compute_pdf().unwrap(),
            Some(CacheOutcome::Computed)
        );
    }

    #[test]
    fn test_delay_pdf_computation() {
        let config = config(GAUSSIAN_MC_SOURCE).with("delay_pdf_computation", true);
        let source = Source::new(&config, "s").unwrap();
        assert_eq!(source.state(), SourceState::RatesBound);
        let d = source.pdf(&[0.0]).unwrap();
        assert!(d > 0.0);
        assert_eq!(source.state(), SourceState::Cached);
    }

    #[test]
    fn test_degenerate_parameters_fail_before_simulation() {
        let bad = config(GAUSSIAN_MC_SOURCE).with("sigma", 0);
        assert!(Source::new(&bad, "s").unwrap_err().is_configuration_error());
        let bad = config(GAUSSIAN_MC_SOURCE).without("mu");
        assert!(Source::new(&bad, "s").unwrap_err().is_configuration_error());
        let bad = config(GAUSSIAN_MC_SOURCE).with("n_events_for_pdf", 0);
        assert!(Source::new(&bad, "s").unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_zero_in_range_is_uniformly_zero() {
        let config = config(GAUSSIAN_MC_SOURCE).with("mu", 1000.0);
        let source = Source::new(&config, "s").unwrap();
        assert_eq!(source.fraction_in_range().unwrap(), 0.0);
        assert_eq!(source.pdf(&[0.0]).unwrap(), 0.0);
        assert_eq!(source.expected_events().unwrap(), 0.0);
        assert!(source.pmf_grid().unwrap().expected.iter().all(|e| *e == 0.0));
    }

    #[test]
    fn test_simulate_stream_is_reproducible() {
        let a = Source::new(&config(GAUSSIAN_SOURCE), "s").unwrap();
        let b = Source::new(&config(GAUSSIAN_SOURCE), "s").unwrap();
        assert_eq!(a.simulate(5), b.simulate(5));
        assert_eq!(a.simulate(5), b.simulate(5));
        assert!(a.simulate(0).is_empty());
        assert_ne!(a.simulate(5), a.simulate(5));
    }

    #[test]
    fn test_explicit_seed() {
        let a = Source::new(&config(GAUSSIAN_SOURCE).with("seed", 11), "s").unwrap();
        let b = Source::new(&config(GAUSSIAN_SOURCE).with("seed", 12), "s").unwrap();
        assert_eq!(a.seed(), 11);
        assert_ne!(a.simulate(3), b.simulate(3));
    }

    #[test]
    fn test_expected_events_and_pmf() {
        let config = config(GAUSSIAN_SOURCE)
            .with("livetime_days", 2.0)
            .with("some_multiplier", 0.5);
        let source = Source::new(&config, "s").unwrap();
        let fraction = source.fraction_in_range().unwrap();
        let expected = source.expected_events().unwrap();
        assert!(approx_eq(expected, 1000.0 * fraction, 1e-9));

        let pmf = source.pmf_grid().unwrap();
        assert_eq!(pmf.shape, vec![40]);
        assert!(approx_eq(pmf.total(), expected, 1e-9));
        assert!(pmf.errors.iter().all(|e| *e == 0.0));
    }

    #[test]
    fn test_pdf_events() {
        let source = Source::new(&config(GAUSSIAN_SOURCE), "s").unwrap();
        let batch = source.simulate(10);
        let densities = source.pdf_events(&batch).unwrap();
        assert_eq!(densities.len(), 10);
        assert!(densities.iter().all(|d| d.is_finite() && *d > 0.0));

        let other = EventBatch::new(vec!["y".to_string()]);
        assert!(source.pdf_events(&other).unwrap_err().is_domain_error());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_source_index_beyond_tag_range() {
        let class = SourceClass::gaussian();
        let source_config = config(GAUSSIAN_SOURCE).for_source("s").unwrap();
        let cache = Arc::new(PdfCache::new());

        let last =
            Source::from_class(&class, source_config.clone(), u32::MAX as usize, cache.clone())
                .unwrap();
        assert_eq!(last.tag(), SourceTag(u32::MAX));

        let err = Source::from_class(&class, source_config, u32::MAX as usize + 1, cache)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_linear_interpolation_rejects_wide_space() {
        let dims: Vec<_> = (0..crate::histogram::MAX_LINEAR_DIMS + 1)
            .map(|i| json!([format!("d{i}"), [0.0, 1.0]]))
            .collect();
        let wide = config(GAUSSIAN_MC_SOURCE)
            .with("analysis_space", dims)
            .with("pdf_interpolation_method", "linear")
            .with("delay_pdf_computation", true);
        assert!(Source::new(&wide, "s").unwrap_err().is_configuration_error());
        let nearest = wide.with("pdf_interpolation_method", "nearest");
        assert!(Source::new(&nearest, "s").is_ok());
    }

    #[test]
    fn test_invalid_livetime() {
        let config = config(GAUSSIAN_SOURCE).with("livetime_days", -1.0);
        assert!(Source::new(&config, "s").unwrap_err().is_configuration_error());
    }
}
