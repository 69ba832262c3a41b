//! Time-window selection over ingested readings.

use chrono::{DateTime, Duration, Utc};
use monitor_core::models::{Reading, TimeWindow};
use tracing::{debug, info};

/// Span of the window used when the caller gives no bound at all.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Selects the readings that fall inside a [`TimeWindow`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowFilter {
    verbose: bool,
}

impl WindowFilter {
    /// `verbose` raises the filter summary from `debug` to `info`.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// The bounds actually applied for `window` at time `now`.
    ///
    /// A fully open window becomes `[now - 24h, now]`; anything else is used
    /// exactly as given.
    pub fn effective_window(window: &TimeWindow, now: DateTime<Utc>) -> TimeWindow {
        if window.is_unbounded() {
            TimeWindow::trailing(Duration::hours(DEFAULT_WINDOW_HOURS), now)
        } else {
            *window
        }
    }

    /// Filter against the wall clock; see [`WindowFilter::filter_at`].
    pub fn filter(&self, readings: &[Reading], window: &TimeWindow) -> Vec<Reading> {
        self.filter_at(readings, window, Utc::now())
    }

    /// Keep every reading inside the effective window (both ends inclusive),
    /// preserving input order.
    pub fn filter_at(
        &self,
        readings: &[Reading],
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> Vec<Reading> {
        let effective = Self::effective_window(window, now);
        let kept: Vec<Reading> = readings
            .iter()
            .filter(|r| effective.contains(r.timestamp))
            .cloned()
            .collect();

        self.report(&effective, &kept);
        kept
    }

    fn report(&self, window: &TimeWindow, kept: &[Reading]) {
        let range = match (kept.first(), kept.last()) {
            (Some(first), Some(last)) => format!("{} -> {}", first.timestamp, last.timestamp),
            _ => "(empty)".to_string(),
        };
        if self.verbose {
            info!("Window: {}", window);
            info!("Rows after filtering: {}", kept.len());
            if !kept.is_empty() {
                info!("Filtered range: {}", range);
            }
        } else {
            debug!(rows = kept.len(), %window, "filtered readings, range {}", range);
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    fn reading(key: &str, ts: DateTime<Utc>) -> Reading {
        Reading {
            key: key.to_string(),
            timestamp: ts,
            temperature: Some(20.0),
            humidity: None,
        }
    }

    fn keys(readings: &[Reading]) -> Vec<&str> {
        readings.iter().map(|r| r.key.as_str()).collect()
    }

    fn sample() -> Vec<Reading> {
        vec![
            reading("a", at(8, 0, 0)),
            reading("b", at(9, 0, 0)),
            reading("c", at(10, 0, 0)),
            reading("d", at(10, 0, 1)),
            reading("e", at(11, 0, 0)),
        ]
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let window = TimeWindow::new(Some(at(9, 0, 0)), Some(at(10, 0, 0)));
        let kept = WindowFilter::default().filter_at(&sample(), &window, at(12, 0, 0));
        assert_eq!(keys(&kept), vec!["b", "c"]);
    }

    #[test]
    fn test_single_sided_bounds() {
        let filter = WindowFilter::default();
        let now = at(12, 0, 0);

        let from = TimeWindow::new(Some(at(10, 0, 0)), None);
        assert_eq!(keys(&filter.filter_at(&sample(), &from, now)), vec!["c", "d", "e"]);

        let until = TimeWindow::new(None, Some(at(9, 0, 0)));
        assert_eq!(keys(&filter.filter_at(&sample(), &until, now)), vec!["a", "b"]);
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let window = TimeWindow::new(Some(at(11, 0, 0)), Some(at(8, 0, 0)));
        assert!(WindowFilter::default()
            .filter_at(&sample(), &window, at(12, 0, 0))
            .is_empty());
    }

    #[test]
    fn test_default_window_is_last_24_hours() {
        let now = at(10, 0, 0);
        let readings = vec![
            reading("too_old", now - Duration::hours(24) - Duration::seconds(1)),
            reading("edge_old", now - Duration::hours(24)),
            reading("recent", now - Duration::hours(1)),
            reading("edge_now", now),
            reading("future", now + Duration::seconds(1)),
        ];
        let filter = WindowFilter::default();

        let defaulted = filter.filter_at(&readings, &TimeWindow::unbounded(), now);
        let explicit = filter.filter_at(
            &readings,
            &TimeWindow::new(Some(now - Duration::hours(24)), Some(now)),
            now,
        );
        assert_eq!(defaulted, explicit);
        assert_eq!(keys(&defaulted), vec!["edge_old", "recent", "edge_now"]);
    }

    #[test]
    fn test_effective_window() {
        let now = at(10, 0, 0);
        let given = TimeWindow::new(None, Some(at(9, 0, 0)));
        assert_eq!(WindowFilter::effective_window(&given, now), given);
        assert_eq!(
            WindowFilter::effective_window(&TimeWindow::unbounded(), now),
            TimeWindow::new(Some(now - Duration::hours(24)), Some(now))
        );
    }

    #[test]
    fn test_filter_preserves_order_and_is_pure() {
        let window = TimeWindow::new(Some(at(8, 30, 0)), None);
        let filter = WindowFilter::new(true);
        let first = filter.filter_at(&sample(), &window, at(12, 0, 0));
        let second = filter.filter_at(&sample(), &window, at(12, 0, 0));
        assert_eq!(first, second);
        assert_eq!(keys(&first), vec!["b", "c", "d", "e"]);
    }

    #[test]
    fn test_filter_uses_wall_clock_for_default() {
        let recent = vec![reading("now", Utc::now() - Duration::minutes(5))];
        let kept = WindowFilter::default().filter(&recent, &TimeWindow::unbounded());
        assert_eq!(keys(&kept), vec!["now"]);
    }
}
