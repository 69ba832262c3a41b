use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::data_processors::TimestampNormalizer;
use crate::models::TimeWindow;

/// Padding applied on both sides of a relative (`--hours`) window so that
/// samples from slow or irregular polling near the edges are kept.
pub const RELATIVE_WINDOW_BUFFER_MINUTES: i64 = 30;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve an IANA timezone name.
///
/// `"auto"` means the system timezone. Unrecognised names fall back to UTC
/// with a warning; this is never fatal.
pub fn resolve_timezone(tz_name: &str) -> Tz {
    let name = if tz_name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        tz_name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

/// Interpret a naive wall-clock time as local time in `tz`.
///
/// During a DST fold the earlier instant wins. A time that falls into a DST
/// gap does not exist locally; it is read with the offset in force before
/// the gap, which lands it the gap's width past the requested wall time.
pub fn localize(naive: &NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let offset_before = tz
                .from_local_datetime(&(*naive - Duration::days(1)))
                .earliest()
                .map(|dt| dt.offset().fix().local_minus_utc())
                .unwrap_or(0);
            (*naive - Duration::seconds(i64::from(offset_before))).and_utc()
        }
    }
}

// ── TimeRequest ───────────────────────────────────────────────────────────────

/// The time selection a user asked for on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeRequest {
    /// `--start` text, verbatim.
    pub start: Option<String>,
    /// `--end` text, verbatim.
    pub end: Option<String>,
    /// `--hours`: last N hours. Takes precedence over `start` / `end`.
    pub hours: Option<f64>,
}

impl TimeRequest {
    /// `true` when the user typed an explicit `--start` or `--end`.
    pub fn has_explicit_bounds(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// `true` when the relative mode is active.
    pub fn is_relative(&self) -> bool {
        self.hours.is_some()
    }
}

// ── CliTimeResolver ───────────────────────────────────────────────────────────

/// Turns CLI time requests into absolute UTC [`TimeWindow`]s.
///
/// Naive text (no offset) is read as wall-clock time in the resolver's
/// timezone. Text with an offset, and epoch numbers, are absolute already.
#[derive(Debug, Clone, Copy)]
pub struct CliTimeResolver {
    tz: Tz,
}

impl CliTimeResolver {
    /// Create a resolver for the named timezone (see [`resolve_timezone`]).
    pub fn new(tz_name: &str) -> Self {
        Self {
            tz: resolve_timezone(tz_name),
        }
    }

    /// Resolver with the timezone treated as absent: naive text is UTC.
    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// The timezone naive text is localized to.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse one CLI bound.
    ///
    /// Returns `None` for absent input and for text no normalizer stage
    /// accepts; the latter is reported with a warning naming the text.
    pub fn resolve_bound(&self, raw: Option<&str>) -> Option<DateTime<Utc>> {
        let raw = raw?;
        match TimestampNormalizer::normalize(raw) {
            Ok(ts) if ts.has_explicit_offset() => Some(ts.instant),
            Ok(ts) => Some(localize(&ts.instant.naive_utc(), self.tz)),
            Err(_) => {
                warn!("Unable to parse timestamp: {}", raw);
                None
            }
        }
    }

    /// `[now - hours - 30min, now + 30min]`.
    ///
    /// A span reaching past the earliest representable instant leaves the
    /// start open.
    pub fn relative_window(&self, hours: f64, now: DateTime<Utc>) -> TimeWindow {
        let buffer = Duration::minutes(RELATIVE_WINDOW_BUFFER_MINUTES);
        let start = Duration::try_milliseconds((hours * 3_600_000.0).round() as i64)
            .and_then(|span| now.checked_sub_signed(span))
            .and_then(|t| t.checked_sub_signed(buffer));
        if start.is_none() {
            debug!(hours, "relative window start out of range; leaving it open");
        }
        TimeWindow::new(start, now.checked_add_signed(buffer))
    }

    /// Window from explicit `start` / `end` text; each side independent.
    pub fn explicit_window(&self, start: Option<&str>, end: Option<&str>) -> TimeWindow {
        TimeWindow::new(self.resolve_bound(start), self.resolve_bound(end))
    }

    /// Resolve a full request. Relative mode overrides explicit bounds; with
    /// neither, the window is unbounded (callers apply their own default).
    pub fn resolve(&self, request: &TimeRequest, now: DateTime<Utc>) -> TimeWindow {
        let window = match request.hours {
            Some(hours) => {
                if request.has_explicit_bounds() {
                    debug!("--hours given; ignoring --start/--end");
                }
                self.relative_window(hours, now)
            }
            None => self.explicit_window(request.start.as_deref(), request.end.as_deref()),
        };
        debug!(tz = %self.tz, %window, "resolved time window");
        window
    }

    /// Second-pass window used when the first pass selected nothing.
    ///
    /// Only explicit requests with at least one bound qualify; their text is
    /// re-read with naive values taken as UTC.
    pub fn fallback_window(&self, request: &TimeRequest) -> Option<TimeWindow> {
        if request.is_relative() || !request.has_explicit_bounds() {
            return None;
        }
        Some(Self::utc().explicit_window(request.start.as_deref(), request.end.as_deref()))
    }
}

// ── Display helpers ───────────────────────────────────────────────────────────

/// Render a UTC instant in `tz` as `YYYY-MM-DD HH:MM:SS TZ`.
pub fn format_in_timezone(dt: &DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
