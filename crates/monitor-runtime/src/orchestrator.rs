//! The fetch → ingest → filter pipeline, including the fallback pass.

use chrono::{DateTime, Utc};
use monitor_core::error::Result;
use monitor_core::models::{Reading, TimeWindow};
use monitor_core::time_utils::{CliTimeResolver, TimeRequest};
use monitor_data::analysis::WindowFilter;
use monitor_data::reader::IngestStats;

use crate::data_manager::DataManager;

// ── Public types ──────────────────────────────────────────────────────────────

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Readings inside `window`, ascending by timestamp.
    pub readings: Vec<Reading>,
    /// The window that was applied last (after the 24h default).
    pub window: TimeWindow,
    /// `true` when `readings` come from the UTC re-interpretation pass.
    pub used_fallback: bool,
    /// Ingestion counters of the underlying fetch.
    pub stats: IngestStats,
}

impl PipelineOutcome {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

// ── MonitoringOrchestrator ────────────────────────────────────────────────────

/// Runs a [`TimeRequest`] against the readings of a [`DataManager`].
#[derive(Debug, Clone)]
pub struct MonitoringOrchestrator {
    resolver: CliTimeResolver,
    request: TimeRequest,
    filter: WindowFilter,
}

impl MonitoringOrchestrator {
    /// `verbose` is forwarded to the [`WindowFilter`].
    pub fn new(resolver: CliTimeResolver, request: TimeRequest, verbose: bool) -> Self {
        Self {
            resolver,
            request,
            filter: WindowFilter::new(verbose),
        }
    }

    /// Run against the wall clock.
    pub fn run(&self, data: &mut DataManager) -> Result<PipelineOutcome> {
        self.run_at(data, Utc::now())
    }

    /// Run with `now` as the reference instant for relative and default
    /// windows.
    ///
    /// When an explicit `--start`/`--end` request selects nothing, the bounds
    /// are read again with naive text taken as UTC and the filter is repeated.
    /// An empty outcome is still `Ok`; deciding what that means is up to the
    /// caller.
    pub fn run_at(&self, data: &mut DataManager, now: DateTime<Utc>) -> Result<PipelineOutcome> {
        let outcome = data.get_data()?;

        let window = self.resolver.resolve(&self.request, now);
        let readings = self.filter.filter_at(&outcome.readings, &window, now);
        let mut result = PipelineOutcome {
            readings,
            window: WindowFilter::effective_window(&window, now),
            used_fallback: false,
            stats: outcome.stats.clone(),
        };
        if !result.is_empty() {
            return Ok(result);
        }

        let Some(fallback) = self.resolver.fallback_window(&self.request) else {
            return Ok(result);
        };
        if fallback == window {
            tracing::debug!("fallback window identical to the first pass; not retrying");
            return Ok(result);
        }

        tracing::info!("Retrying with UTC interpretation of --start/--end: {}", fallback);
        result.readings = self.filter.filter_at(&outcome.readings, &fallback, now);
        result.window = WindowFilter::effective_window(&fallback, now);
        result.used_fallback = true;
        Ok(result)
    }
}

/// Most recent plausible reading at the data manager's location.
pub fn latest_reading(data: &mut DataManager) -> Result<Option<Reading>> {
    Ok(data.get_data()?.readings.last().cloned())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
