//! Conversion of raw store entries into [`Reading`]s.
//!
//! Every entry is checked independently; anything that cannot become a
//! plausible reading is dropped and counted, never raised.

use chrono::{DateTime, Datelike, Utc};
use monitor_core::data_processors::{MeasurementExtractor, TimestampNormalizer};
use monitor_core::models::{Reading, MIN_PLAUSIBLE_YEAR};
use serde_json::Value;
use tracing::{debug, info};

use crate::store::RawEntries;

// ── Public types ──────────────────────────────────────────────────────────────

/// Diagnostic counters gathered while ingesting one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Entries present in the raw mapping.
    pub total: usize,
    /// Entries that became readings.
    pub accepted: usize,
    /// Entries that were not records or had no timestamp.
    pub skipped_malformed: usize,
    /// Entries whose timestamp no parse stage accepted.
    pub skipped_invalid: usize,
    /// Entries whose timestamp predates [`MIN_PLAUSIBLE_YEAR`].
    pub skipped_old: usize,
    /// Oldest accepted timestamp.
    pub earliest: Option<DateTime<Utc>>,
    /// Newest accepted timestamp.
    pub latest: Option<DateTime<Utc>>,
}

/// Readings plus the counters describing how they were obtained.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    /// Accepted readings, ascending by timestamp (ties by key).
    pub readings: Vec<Reading>,
    pub stats: IngestStats,
}

/// Why a single entry was not turned into a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Malformed,
    Invalid,
    Old,
}

// ── ReadingIngester ───────────────────────────────────────────────────────────

/// Turns the raw mapping returned by the store into ordered readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingIngester {
    verbose: bool,
}

impl ReadingIngester {
    /// `verbose` raises the ingestion summary from `debug` to `info`.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Ingest every entry of `raw`.
    ///
    /// The result does not depend on the iteration order of `raw`.
    pub fn ingest(&self, raw: &RawEntries) -> IngestOutcome {
        let mut stats = IngestStats {
            total: raw.len(),
            ..Default::default()
        };
        let mut readings = Vec::with_capacity(raw.len());

        for (key, entry) in raw {
            match to_reading(key, entry) {
                Ok(reading) => readings.push(reading),
                Err(Skip::Malformed) => stats.skipped_malformed += 1,
                Err(Skip::Invalid) => stats.skipped_invalid += 1,
                Err(Skip::Old) => stats.skipped_old += 1,
            }
        }

        readings.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.key.cmp(&b.key)));

        stats.accepted = readings.len();
        stats.earliest = readings.first().map(|r| r.timestamp);
        stats.latest = readings.last().map(|r| r.timestamp);

        self.report(&stats);

        IngestOutcome { readings, stats }
    }

    fn report(&self, stats: &IngestStats) {
        let range = match (stats.earliest, stats.latest) {
            (Some(first), Some(last)) => format!("{} -> {}", first, last),
            _ => "(empty)".to_string(),
        };
        if self.verbose {
            info!("Fetched {} rows. Range: {}", stats.accepted, range);
            info!(
                "Skipped {} entries with invalid timestamps, {} older than {}, {} malformed",
                stats.skipped_invalid, stats.skipped_old, MIN_PLAUSIBLE_YEAR, stats.skipped_malformed
            );
        } else {
            debug!(
                accepted = stats.accepted,
                invalid = stats.skipped_invalid,
                old = stats.skipped_old,
                malformed = stats.skipped_malformed,
                "ingested readings, range {}",
                range
            );
        }
    }
}

fn to_reading(key: &str, entry: &Value) -> Result<Reading, Skip> {
    let record = entry.as_object().ok_or(Skip::Malformed)?;
    let raw_ts = match record.get("timestamp") {
        None | Some(Value::Null) => return Err(Skip::Malformed),
        Some(ts) => ts,
    };

    let timestamp = TimestampNormalizer::normalize_value(raw_ts)
        .map_err(|_| Skip::Invalid)?
        .instant;
    if timestamp.year() < MIN_PLAUSIBLE_YEAR {
        return Err(Skip::Old);
    }

    Ok(Reading {
        key: key.to_string(),
        timestamp,
        temperature: MeasurementExtractor::extract(record, "temperature"),
        humidity: MeasurementExtractor::extract(record, "humidity"),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use serde_json::json;

    fn raw(value: Value) -> RawEntries {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn test_end_to_end_drops_pre_2000() {
        let outcome = ReadingIngester::default().ingest(&raw(json!({
            "a": {"timestamp": "1700000000", "temperature": 20.0, "humidity": 55},
            "b": {"timestamp": "1999-01-01T00:00:00Z", "temperature": 1, "humidity": 1}
        })));

        assert_eq!(outcome.readings.len(), 1);
        let reading = &outcome.readings[0];
        assert_eq!(reading.key, "a");
        assert_eq!(
            reading.timestamp,
            Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()
        );
        assert_eq!(reading.temperature, Some(20.0));
        assert_eq!(reading.humidity, Some(55.0));
        assert_eq!(outcome.stats.skipped_old, 1);
        assert_eq!(outcome.stats.skipped_invalid, 0);
    }

    #[test]
    fn test_skip_classification() {
        let outcome = ReadingIngester::new(true).ingest(&raw(json!({
            "scalar": 42,
            "list": [1, 2],
            "no_ts": {"temperature": 20.0},
            "null_ts": {"timestamp": null},
            "garbage": {"timestamp": "not-a-timestamp"},
            "bool_ts": {"timestamp": true},
            "epoch_zero": {"timestamp": 0},
            "ok": {"timestamp": 1700000000}
        })));

        let stats = &outcome.stats;
        assert_eq!(stats.total, 8);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.skipped_malformed, 4);
        assert_eq!(stats.skipped_invalid, 2);
        assert_eq!(stats.skipped_old, 1);
        assert_eq!(outcome.readings[0].key, "ok");
    }

    #[test]
    fn test_output_is_sorted_and_stats_span_it() {
        let outcome = ReadingIngester::default().ingest(&raw(json!({
            "z": {"timestamp": 1700000300},
            "m": {"timestamp": "2023-11-14T22:13:20Z"},
            "a": {"timestamp": 1700000100000_i64},
            "b": {"timestamp": "2023-11-14 22:13:20"}
        })));

        let keys: Vec<&str> = outcome.readings.iter().map(|r| r.key.as_str()).collect();
        // "b" and "m" share an instant; ties go by key.
        assert_eq!(keys, vec!["b", "m", "a", "z"]);
        assert!(outcome
            .readings
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(outcome.stats.earliest, Some(outcome.readings[0].timestamp));
        assert_eq!(outcome.stats.latest, Some(outcome.readings[3].timestamp));
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let input = raw(json!({
            "x": {"timestamp": 1700000000, "temperature": 1.0},
            "y": {"timestamp": 1700000000, "temperature": 2.0},
            "w": {"timestamp": "2024-02-01T00:00:00Z", "humidity": 40}
        }));
        let ingester = ReadingIngester::default();
        let first = ingester.ingest(&input);
        let second = ingester.ingest(&input);
        assert_eq!(first.readings, second.readings);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        let outcome = ReadingIngester::default().ingest(&RawEntries::new());
        assert!(outcome.readings.is_empty());
        assert_eq!(outcome.stats, IngestStats::default());
    }

    #[test]
    fn test_all_invalid_input_is_empty_output() {
        let outcome = ReadingIngester::default().ingest(&raw(json!({
            "a": {"timestamp": "??"},
            "b": {"timestamp": 12}
        })));
        assert!(outcome.readings.is_empty());
        assert!(outcome.stats.earliest.is_none());
        assert_eq!(outcome.stats.skipped_invalid + outcome.stats.skipped_old, 2);
    }

    #[test]
    fn test_measurements_are_optional() {
        let outcome = ReadingIngester::default().ingest(&raw(json!({
            "a": {"timestamp": 1700000000, "temperature": "bad", "humidity": null}
        })));
        assert_eq!(outcome.readings[0].temperature, None);
        assert_eq!(outcome.readings[0].humidity, None);
    }
}
