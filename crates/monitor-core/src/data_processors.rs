use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::trace;

use crate::error::{MonitorError, Result};

// ── TimestampFormat ───────────────────────────────────────────────────────────

/// Which parse strategy recognised a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Numeric value ≤ 1e11, read as seconds since the Unix epoch.
    EpochSeconds,
    /// Numeric value > 1e11, read as milliseconds since the Unix epoch.
    EpochMillis,
    /// ISO 8601 / RFC 3339 with an explicit UTC offset (or `Z`).
    Iso8601,
    /// ISO 8601 without an offset; taken as UTC.
    Iso8601Naive,
    /// `YYYY-MM-DD HH:MM:SS`; taken as UTC.
    SpaceSeparated,
}

/// Result of a successful [`TimestampNormalizer::normalize`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedTimestamp {
    /// The absolute instant. Naive inputs are read as UTC wall-clock time.
    pub instant: DateTime<Utc>,
    /// The strategy that matched.
    pub format: TimestampFormat,
}

impl NormalizedTimestamp {
    /// `true` when the source pinned down an absolute instant on its own
    /// (epoch numbers, offset-bearing ISO strings).
    ///
    /// Naive results can be re-localized by callers that know which timezone
    /// the wall-clock text was written in.
    pub fn has_explicit_offset(&self) -> bool {
        !matches!(
            self.format,
            TimestampFormat::Iso8601Naive | TimestampFormat::SpaceSeparated
        )
    }
}

// ── TimestampNormalizer ───────────────────────────────────────────────────────

/// Numeric timestamps above this are milliseconds, at or below it seconds.
///
/// Seconds for this century sit around 1.7e9, milliseconds around 1.7e12.
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Outcome of a single parse stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// The stage recognised and converted the input.
    Matched(NormalizedTimestamp),
    /// The stage recognised the input but it cannot be represented; later
    /// stages must not run.
    Rejected,
    /// The stage does not apply; try the next one.
    NoMatch,
}

type Strategy = fn(&str) -> Stage;

/// Parse stages, in precedence order. First `Matched` or `Rejected` wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("epoch", parse_epoch),
    ("iso8601", parse_iso8601),
    ("fixed-pattern", parse_fixed_pattern),
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_ISO_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const FIXED_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Converts the heterogeneous timestamps written by sensor devices
/// (unix seconds, unix milliseconds, ISO 8601 text) into UTC instants.
pub struct TimestampNormalizer;

impl TimestampNormalizer {
    /// Normalize a raw timestamp string.
    ///
    /// Stages run in order: numeric epoch, ISO 8601, `YYYY-MM-DD HH:MM:SS`.
    /// A numeric input never falls through to the text stages, even when the
    /// resulting year is implausible; plausibility is the caller's concern.
    pub fn normalize(raw: &str) -> Result<NormalizedTimestamp> {
        let trimmed = raw.trim();
        for (name, strategy) in STRATEGIES {
            match strategy(trimmed) {
                Stage::Matched(ts) => {
                    trace!(stage = name, raw, "timestamp matched");
                    return Ok(ts);
                }
                Stage::Rejected => {
                    trace!(stage = name, raw, "timestamp rejected");
                    return Err(MonitorError::TimestampParse(raw.to_string()));
                }
                Stage::NoMatch => {}
            }
        }
        Err(MonitorError::TimestampParse(raw.to_string()))
    }

    /// Normalize a JSON scalar by first rendering it as text.
    ///
    /// Strings are used verbatim and numbers via their JSON text; any other
    /// value renders to something no stage accepts.
    pub fn normalize_value(value: &Value) -> Result<NormalizedTimestamp> {
        Self::normalize(&stringify(value))
    }
}

fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

fn parse_epoch(raw: &str) -> Stage {
    let Ok(n) = raw.parse::<f64>() else {
        return Stage::NoMatch;
    };
    if !n.is_finite() {
        return Stage::Rejected;
    }

    let (secs, format) = if n > EPOCH_MILLIS_THRESHOLD {
        (n / 1000.0, TimestampFormat::EpochMillis)
    } else {
        (n, TimestampFormat::EpochSeconds)
    };

    match from_fractional_seconds(secs) {
        Some(instant) => Stage::Matched(NormalizedTimestamp { instant, format }),
        None => Stage::Rejected,
    }
}

fn from_fractional_seconds(secs: f64) -> Option<DateTime<Utc>> {
    let whole = secs.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let mut whole = whole as i64;
    let mut nanos = ((secs - secs.floor()) * 1_000_000_000.0).round() as u32;
    if nanos >= 1_000_000_000 {
        whole = whole.checked_add(1)?;
        nanos -= 1_000_000_000;
    }
    DateTime::from_timestamp(whole, nanos)
}

fn parse_iso8601(raw: &str) -> Stage {
    let iso = |instant| {
        Stage::Matched(NormalizedTimestamp {
            instant,
            format: TimestampFormat::Iso8601,
        })
    };
    let naive = |dt: NaiveDateTime| {
        Stage::Matched(NormalizedTimestamp {
            instant: dt.and_utc(),
            format: TimestampFormat::Iso8601Naive,
        })
    };

    // chrono accepts a trailing `Z` directly in RFC 3339.
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return iso(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return iso(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_ISO_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive(dt);
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return naive(midnight);
    }

    Stage::NoMatch
}

fn parse_fixed_pattern(raw: &str) -> Stage {
    match NaiveDateTime::parse_from_str(raw, FIXED_PATTERN) {
        Ok(dt) => Stage::Matched(NormalizedTimestamp {
            instant: dt.and_utc(),
            format: TimestampFormat::SpaceSeparated,
        }),
        Err(_) => Stage::NoMatch,
    }
}

// ── MeasurementExtractor ──────────────────────────────────────────────────────

/// Pulls optional numeric measurements out of a raw store entry.
pub struct MeasurementExtractor;

impl MeasurementExtractor {
    /// Read `field` from `entry` as `f64`.
    ///
    /// JSON numbers and numeric strings are accepted; anything else (missing,
    /// `null`, non-finite, booleans, objects) yields `None`.
    pub fn extract(entry: &serde_json::Map<String, Value>, field: &str) -> Option<f64> {
        let value = match entry.get(field)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
