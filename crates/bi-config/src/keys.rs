//! Recognized configuration option names.

/// Location parameter of the Gaussian classes.
pub const MU: &str = "mu";
/// Scale parameter of the Gaussian classes.
pub const SIGMA: &str = "sigma";
/// Numeric rate multiplier.
pub const SOME_MULTIPLIER: &str = "some_multiplier";
/// String whose length multiplies the rate.
pub const STRLEN_MULTIPLIER: &str = "strlen_multiplier";
/// Bypass (and replace) any cached PDF.
pub const FORCE_PDF_RECALCULATION: &str = "force_pdf_recalculation";
/// Skip the PDF computation at construction time.
pub const DELAY_PDF_COMPUTATION: &str = "delay_pdf_computation";
/// Class used when a source entry omits `class`.
pub const DEFAULT_SOURCE_CLASS: &str = "default_source_class";
/// Per-source class override.
pub const CLASS: &str = "class";
/// List of per-source override maps.
pub const SOURCES: &str = "sources";
/// Source name inside a `sources` entry.
pub const NAME: &str = "name";
/// `[[dimension, [edges...]], ...]`.
pub const ANALYSIS_SPACE: &str = "analysis_space";
/// Monte Carlo sample size for PDF estimation.
pub const N_EVENTS_FOR_PDF: &str = "n_events_for_pdf";
/// Events generated per simulation batch while estimating a PDF.
pub const PDF_SAMPLING_BATCH_SIZE: &str = "pdf_sampling_batch_size";
/// `nearest` or `linear`.
pub const PDF_INTERPOLATION_METHOD: &str = "pdf_interpolation_method";
/// Random seed for simulation.
pub const SEED: &str = "seed";
/// Base rate override.
pub const EVENTS_PER_DAY: &str = "events_per_day";
/// Exposure in days.
pub const LIVETIME_DAYS: &str = "livetime_days";
/// Directory for the on-disk PDF cache.
pub const CACHE_DIR: &str = "cache_dir";
/// Built-in list of unhashed keys; informational only.
pub const DONT_HASH_SETTINGS: &str = "dont_hash_settings";
/// User-provided keys to leave out of the fingerprint.
pub const EXTRA_DONT_HASH_SETTINGS: &str = "extra_dont_hash_settings";
/// Display label.
pub const LABEL: &str = "label";
/// Display color.
pub const COLOR: &str = "color";
