//! Blueice core: sources of simulated events and their densities.
//!
//! A [`Source`] binds one configuration to an analysis space. Its density
//! comes either from a closed form or from a histogram of Monte Carlo
//! events; estimated densities are cached by a fingerprint of the options
//! that shape the distribution, so sibling sources that differ only in rate
//! or cosmetics share one simulation.

pub mod batch;
pub mod error;
pub mod histogram;
pub mod logging;
pub mod source;
pub mod space;

pub use batch::{EventBatch, EventRecord, SourceTag};
pub use error::{Error, ErrorCategory, Result};
pub use histogram::{Histogram, Interpolation, PdfHistogram};
pub use source::{
    CacheOutcome, PdfCache, PmfGrid, Source, SourceClass, SourceRegistry, SourceState,
    GAUSSIAN_MC_SOURCE, GAUSSIAN_SOURCE,
};
pub use space::{AnalysisSpace, Dimension};

pub use bi_config::Config;
