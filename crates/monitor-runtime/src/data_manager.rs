//! Fetch-and-ingest wrapper around a [`StoreReader`].
//!
//! A run reads the sensor location once; the fallback pass and the
//! latest-reading lookup work from the cached [`IngestOutcome`] instead of
//! hitting the store again.

use monitor_core::error::Result;
use monitor_data::reader::{IngestOutcome, ReadingIngester};
use monitor_data::store::StoreReader;

// ── DataManager ───────────────────────────────────────────────────────────────

/// Cached view of the readings stored under one location.
///
/// # Example
/// ```no_run
/// use monitor_data::store::JsonFileStore;
/// use monitor_runtime::data_manager::DataManager;
///
/// let mut mgr = DataManager::new(Box::new(JsonFileStore::new("export.json")), "/sensors/device1", false);
/// let outcome = mgr.get_data()?;
/// println!("readings: {}", outcome.readings.len());
/// # Ok::<(), monitor_core::error::MonitorError>(())
/// ```
pub struct DataManager {
    store: Box<dyn StoreReader>,
    /// Store location holding the readings, e.g. `/sensors/device1`.
    ref_path: String,
    ingester: ReadingIngester,
    cache: Option<IngestOutcome>,
}

impl DataManager {
    /// `verbose` is forwarded to the [`ReadingIngester`].
    pub fn new(store: Box<dyn StoreReader>, ref_path: impl Into<String>, verbose: bool) -> Self {
        Self {
            store,
            ref_path: ref_path.into(),
            ingester: ReadingIngester::new(verbose),
            cache: None,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Ingested readings, fetched on first use.
    ///
    /// An empty or absent location gives an empty outcome. Store errors are
    /// returned as-is and leave nothing cached, so the next call fetches again.
    pub fn get_data(&mut self) -> Result<&IngestOutcome> {
        if self.cache.is_none() {
            let outcome = self.fetch_fresh()?;
            self.cache = Some(outcome);
        } else {
            tracing::debug!("returning cached readings");
        }
        Ok(self.cache.get_or_insert_with(IngestOutcome::default))
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn fetch_fresh(&self) -> Result<IngestOutcome> {
        match self.store.get(&self.ref_path)? {
            Some(raw) => Ok(self.ingester.ingest(&raw)),
            None => {
                tracing::debug!(path = %self.ref_path, "no entries at store location");
                Ok(IngestOutcome::default())
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
