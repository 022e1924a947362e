//! Source classes and their resolution by name.
//!
//! A [`SourceClass`] bundles a name, a default base rate, a rate policy and a
//! model builder. The [`SourceRegistry`] maps class names to classes and owns
//! the PDF cache handed to every source it builds; the built-in classes are
//! `GaussianSource` (analytic) and `GaussianMCSource` (Monte Carlo).
//!
//! A class also lists the defaults its builder falls back on. They are filled
//! in before fingerprinting, so an option left implicit and the same value
//! written out share one cache entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bi_config::{keys, Config};

use super::cache::PdfCache;
use super::density::DEFAULT_N_EVENTS_FOR_PDF;
use super::gaussian::{GaussianModel, DEFAULT_SIGMA, GAUSSIAN_EVENTS_PER_DAY};
use super::model::SourceModel;
use super::rate::{MultiplierRate, RatePolicy};
use super::Source;
use crate::error::{Error, Result};
use crate::logging::{event_names, Stage};
use crate::space::AnalysisSpace;

pub const GAUSSIAN_SOURCE: &str = "GaussianSource";
pub const GAUSSIAN_MC_SOURCE: &str = "GaussianMCSource";

/// Builds a class's model from a merged source configuration.
pub type ModelBuilder = Arc<dyn Fn(&Config, &AnalysisSpace) -> Result<SourceModel> + Send + Sync>;

/// A named recipe for sources.
#[derive(Clone)]
pub struct SourceClass {
    name: String,
    default_events_per_day: f64,
    rate_policy: Arc<dyn RatePolicy>,
    defaults: Config,
    builder: ModelBuilder,
}

impl fmt::Debug for SourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceClass")
            .field("name", &self.name)
            .field("default_events_per_day", &self.default_events_per_day)
            .field("rate_policy", &self.rate_policy)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl SourceClass {
    pub fn new<F>(
        name: impl Into<String>,
        default_events_per_day: f64,
        rate_policy: Arc<dyn RatePolicy>,
        builder: F,
    ) -> Self
    where
        F: Fn(&Config, &AnalysisSpace) -> Result<SourceModel> + Send + Sync + 'static,
    {
        SourceClass {
            name: name.into(),
            default_events_per_day,
            rate_policy,
            defaults: Config::new(),
            builder: Arc::new(builder),
        }
    }

    /// Values the builder assumes for absent options.
    pub fn with_defaults(mut self, defaults: Config) -> Self {
        self.defaults = defaults;
        self
    }

    /// Closed-form Gaussian: analytic density, Gaussian events.
    pub fn gaussian() -> Self {
        SourceClass::new(
            GAUSSIAN_SOURCE,
            GAUSSIAN_EVENTS_PER_DAY,
            Arc::new(MultiplierRate::gaussian_default()),
            |config, space| {
                let model = Arc::new(GaussianModel::from_config(config, space.n_dims())?);
                Ok(SourceModel::Analytic {
                    generator: model.clone(),
                    closed_form: model,
                })
            },
        )
        .with_defaults(Config::new().with(keys::SIGMA, DEFAULT_SIGMA))
    }

    /// Gaussian whose density is estimated from simulated events.
    pub fn gaussian_mc() -> Self {
        SourceClass::new(
            GAUSSIAN_MC_SOURCE,
            GAUSSIAN_EVENTS_PER_DAY,
            Arc::new(MultiplierRate::gaussian_default()),
            |config, space| {
                let model = GaussianModel::from_config(config, space.n_dims())?;
                Ok(SourceModel::Simulated {
                    generator: Arc::new(model),
                })
            },
        )
        .with_defaults(
            Config::new()
                .with(keys::SIGMA, DEFAULT_SIGMA)
                .with(keys::N_EVENTS_FOR_PDF, DEFAULT_N_EVENTS_FOR_PDF),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_events_per_day(&self) -> f64 {
        self.default_events_per_day
    }

    pub fn rate_policy(&self) -> &Arc<dyn RatePolicy> {
        &self.rate_policy
    }

    pub fn defaults(&self) -> &Config {
        &self.defaults
    }

    pub fn build_model(&self, config: &Config, space: &AnalysisSpace) -> Result<SourceModel> {
        (self.builder)(config, space)
    }
}

/// Class lookup plus the PDF cache shared by every source built here.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    classes: HashMap<String, SourceClass>,
    cache: Arc<PdfCache>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        SourceRegistry::with_builtin()
    }
}

impl SourceRegistry {
    /// No classes, fresh cache.
    pub fn empty() -> Self {
        SourceRegistry {
            classes: HashMap::new(),
            cache: Arc::new(PdfCache::new()),
        }
    }

    /// The built-in Gaussian classes, fresh cache.
    pub fn with_builtin() -> Self {
        let mut registry = SourceRegistry::empty();
        registry.register(SourceClass::gaussian());
        registry.register(SourceClass::gaussian_mc());
        registry
    }

    /// Use `cache` for every source built from now on.
    pub fn with_cache(mut self, cache: Arc<PdfCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Add or replace a class; returns the replaced one.
    pub fn register(&mut self, class: SourceClass) -> Option<SourceClass> {
        tracing::debug!(
            event = event_names::CLASS_REGISTERED,
            stage = %Stage::Construct,
            class = %class.name(),
            "source class registered"
        );
        self.classes.insert(class.name().to_string(), class)
    }

    pub fn get(&self, name: &str) -> Option<&SourceClass> {
        self.classes.get(name)
    }

    /// Registered class names, sorted.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn cache(&self) -> &Arc<PdfCache> {
        &self.cache
    }

    /// Class named by the source's `class` option, else by
    /// `default_source_class`.
    pub fn resolve_class(&self, source_config: &Config) -> Result<&SourceClass> {
        let name = match source_config.get_str(keys::CLASS)? {
            Some(name) => name,
            None => source_config
                .get_str(keys::DEFAULT_SOURCE_CLASS)?
                .ok_or_else(|| Error::NoSourceClass {
                    source_name: source_config
                        .get_str(keys::NAME)
                        .ok()
                        .flatten()
                        .unwrap_or_default()
                        .to_string(),
                })?,
        };
        self.get(name)
            .ok_or_else(|| Error::UnknownSourceClass(name.to_string()))
    }

    /// Build source `name` from a model-level configuration.
    pub fn build(&self, config: &Config, name: &str) -> Result<Source> {
        let source_config = config.for_source(name)?;
        let class = self.resolve_class(&source_config)?;
        let tag = config.source_index(name)?.unwrap_or(0);
        Source::from_class(class, source_config, tag, Arc::clone(&self.cache))
    }

    /// Build every source listed under `sources`, in order.
    pub fn build_all(&self, config: &Config) -> Result<Vec<Source>> {
        config
            .source_names()?
            .iter()
            .map(|name| self.build(config, name))
            .collect()
    }
}
