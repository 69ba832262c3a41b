use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Earliest calendar year accepted for a sensor reading. Anything older is
/// treated as device-side clock garbage (e.g. an RTC that lost power).
pub const MIN_PLAUSIBLE_YEAR: i32 = 2000;

/// A single temperature / humidity sample stored under `key` in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Store-assigned identifier, unique per fetch.
    pub key: String,
    /// When the sample was taken, resolved to UTC.
    pub timestamp: DateTime<Utc>,
    /// Temperature in degrees Celsius, if the device reported one.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Relative humidity in percent, if the device reported one.
    #[serde(default)]
    pub humidity: Option<f64>,
}

/// Inclusive time range used to select readings.
///
/// A missing bound leaves that side of the range open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Window with neither bound set.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// `[end - span, end]`.
    pub fn trailing(span: Duration, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(end - span),
            end: Some(end),
        }
    }

    /// `true` when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Inclusive membership test; an absent bound never excludes.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| ts >= start) && self.end.map_or(true, |end| ts <= end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_bound = |b: Option<DateTime<Utc>>| {
            b.map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| "(open)".to_string())
        };
        write!(f, "{} -> {}", fmt_bound(self.start), fmt_bound(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_contains_is_inclusive_on_both_ends() {
        let window = TimeWindow::new(Some(at(9, 0)), Some(at(10, 0)));
        assert!(window.contains(at(9, 0)));
        assert!(window.contains(at(10, 0)));
        assert!(!window.contains(at(10, 0) + Duration::seconds(1)));
        assert!(!window.contains(at(9, 0) - Duration::seconds(1)));
    }

    #[test]
    fn test_open_bounds() {
        let only_end = TimeWindow::new(None, Some(at(10, 0)));
        assert!(only_end.contains(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap()));
        assert!(!only_end.contains(at(11, 0)));

        let only_start = TimeWindow::new(Some(at(10, 0)), None);
        assert!(only_start.contains(at(23, 59)));
        assert!(!only_start.contains(at(9, 59)));
    }

    #[test]
    fn test_unbounded_and_trailing() {
        assert!(TimeWindow::unbounded().is_unbounded());
        let trailing = TimeWindow::trailing(Duration::hours(24), at(12, 0));
        assert_eq!(
            trailing.start,
            Some(Utc.with_ymd_and_hms(2023, 12, 31, 12, 0, 0).unwrap())
        );
        assert_eq!(trailing.end, Some(at(12, 0)));
        assert!(!trailing.is_unbounded());
    }

    #[test]
    fn test_display() {
        let window = TimeWindow::new(Some(at(9, 30)), None);
        assert_eq!(window.to_string(), "2024-01-01T09:30:00+00:00 -> (open)");
    }

    #[test]
    fn test_reading_serde_defaults_missing_values() {
        let reading: Reading =
            serde_json::from_str(r#"{"key":"a","timestamp":"2024-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(reading.key, "a");
        assert!(reading.temperature.is_none());
        assert!(reading.humidity.is_none());
    }
}
