//! Fingerprint-keyed cache of estimated PDFs.
//!
//! The cache is an explicit value shared through `Arc`; nothing is global.
//! Each fingerprint has its own slot guarded by a mutex, so concurrent
//! requests for the same fingerprint compute once while other fingerprints
//! proceed in parallel. Entries are immutable and replaced whole.
//!
//! An optional [`DiskStore`] persists entries as `<fingerprint>.json`,
//! written to a temporary file and renamed into place.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bi_config::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::histogram::PdfHistogram;
use crate::logging::{event_names, Stage};

/// One cached density estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    /// Canonical descriptor the fingerprint was computed from.
    pub descriptor: String,
    pub histogram: PdfHistogram,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(fingerprint: Fingerprint, descriptor: String, histogram: PdfHistogram) -> Self {
        CacheEntry {
            fingerprint,
            descriptor,
            histogram,
            created_at: Utc::now(),
        }
    }

    fn check_descriptor(&self, requested: &str) -> Result<()> {
        if self.descriptor == requested {
            return Ok(());
        }
        tracing::error!(
            event = event_names::CACHE_INCONSISTENT,
            stage = %Stage::Cache,
            fingerprint = %self.fingerprint.short_id(),
            "cached descriptor does not match request"
        );
        Err(Error::CacheInconsistency {
            fingerprint: self.fingerprint.to_string(),
            cached: self.descriptor.clone(),
            requested: requested.to_string(),
        })
    }
}

/// How a request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    /// In-memory entry reused.
    Hit,
    /// Loaded from the disk store.
    DiskHit,
    /// Freshly computed (miss or forced).
    Computed,
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub disk_hits: u64,
    pub computed: u64,
}

type Slot = Arc<Mutex<Option<Arc<CacheEntry>>>>;

/// In-memory PDF cache with per-fingerprint guards.
#[derive(Debug, Default)]
pub struct PdfCache {
    slots: Mutex<HashMap<Fingerprint, Slot>>,
    hits: AtomicU64,
    disk_hits: AtomicU64,
    computed: AtomicU64,
}

impl PdfCache {
    pub fn new() -> Self {
        PdfCache::default()
    }

    fn slot(&self, fingerprint: &Fingerprint) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(fingerprint.clone()).or_default().clone()
    }

    /// Current entry for `fingerprint`, if any. Waits for an in-flight
    /// computation of the same fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<CacheEntry>> {
        let slot = self.slot(fingerprint);
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Store `entry`, replacing any entry with the same fingerprint.
    pub fn insert(&self, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        let slot = self.slot(&entry.fingerprint);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::clone(&entry));
        entry
    }

    /// Serve `fingerprint` from memory, then `disk`, then `compute`.
    ///
    /// With `force`, both tiers are skipped and the computed entry replaces
    /// whatever was stored. A stored entry whose descriptor differs from
    /// `descriptor` is a [`Error::CacheInconsistency`].
    pub fn get_or_compute<F>(
        &self,
        fingerprint: &Fingerprint,
        descriptor: &str,
        force: bool,
        disk: Option<&DiskStore>,
        compute: F,
    ) -> Result<(Arc<CacheEntry>, CacheOutcome)>
    where
        F: FnOnce() -> Result<PdfHistogram>,
    {
        let slot = self.slot(fingerprint);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if force {
            tracing::info!(
                event = event_names::CACHE_FORCED,
                stage = %Stage::Cache,
                fingerprint = %fingerprint.short_id(),
                "forced PDF recalculation"
            );
        } else {
            if let Some(entry) = guard.as_ref() {
                entry.check_descriptor(descriptor)?;
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    event = event_names::CACHE_HIT,
                    stage = %Stage::Cache,
                    fingerprint = %fingerprint.short_id(),
                    "PDF cache hit"
                );
                return Ok((Arc::clone(entry), CacheOutcome::Hit));
            }
            if let Some(entry) = disk.and_then(|d| d.load(fingerprint)) {
                entry.check_descriptor(descriptor)?;
                let entry = Arc::new(entry);
                *guard = Some(Arc::clone(&entry));
                self.disk_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    event = event_names::CACHE_DISK_HIT,
                    stage = %Stage::Cache,
                    fingerprint = %fingerprint.short_id(),
                    "PDF loaded from disk cache"
                );
                return Ok((entry, CacheOutcome::DiskHit));
            }
            tracing::debug!(
                event = event_names::CACHE_MISS,
                stage = %Stage::Cache,
                fingerprint = %fingerprint.short_id(),
                "PDF cache miss"
            );
        }

        let histogram = compute()?;
        let entry = Arc::new(CacheEntry::new(
            fingerprint.clone(),
            descriptor.to_string(),
            histogram,
        ));

        if let Some(store) = disk {
            if let Err(e) = store.save(&entry) {
                tracing::warn!(
                    event = event_names::CACHE_DISK_WRITE_FAILED,
                    stage = %Stage::Cache,
                    fingerprint = %fingerprint.short_id(),
                    error = %e,
                    "could not persist PDF"
                );
            }
        }

        *guard = Some(Arc::clone(&entry));
        self.computed.fetch_add(1, Ordering::Relaxed);
        Ok((entry, CacheOutcome::Computed))
    }

    /// Drop the entry for `fingerprint`. Returns whether one was stored.
    pub fn remove(&self, fingerprint: &Fingerprint) -> bool {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.remove(fingerprint)
        };
        match slot {
            Some(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some(),
            None => false,
        }
    }

    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of fingerprints with a stored entry.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .filter(|s| s.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            computed: self.computed.load(Ordering::Relaxed),
        }
    }
}

/// Directory of persisted cache entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DiskStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint))
    }

    /// Load the entry for `fingerprint`. Missing files are a silent miss;
    /// unreadable or corrupt files are logged and treated as a miss.
    pub fn load(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let path = self.path_for(fingerprint);
        if !path.exists() {
            return None;
        }
        match Self::read(&path) {
            Ok(entry) if entry.fingerprint == *fingerprint => Some(entry),
            Ok(entry) => {
                tracing::warn!(
                    event = event_names::CACHE_DISK_READ_FAILED,
                    stage = %Stage::Cache,
                    path = %path.display(),
                    stored = %entry.fingerprint.short_id(),
                    "disk cache file holds another fingerprint"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    event = event_names::CACHE_DISK_READ_FAILED,
                    stage = %Stage::Cache,
                    path = %path.display(),
                    error = %e,
                    "ignoring unreadable disk cache file"
                );
                None
            }
        }
    }

    fn read(path: &Path) -> Result<CacheEntry> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Persist `entry` atomically.
    pub fn save(&self, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(&entry.fingerprint);
        let temp_path = self
            .dir
            .join(format!("{}.{}.tmp", entry.fingerprint, std::process::id()));
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, entry)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&temp_path, &path)?;

        Ok(())
    }
}
