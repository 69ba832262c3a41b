use chrono_tz::Tz;

use crate::models::Reading;
use crate::time_utils::format_in_timezone;

/// Format an optional measurement with its unit, or `"n/a"` when absent.
///
/// # Examples
///
/// ```
/// use monitor_core::formatting::format_measurement;
///
/// assert_eq!(format_measurement(Some(21.456), "°C"), "21.46 °C");
/// assert_eq!(format_measurement(Some(55.0), "%"), "55.00 %");
/// assert_eq!(format_measurement(None, "%"), "n/a");
/// ```
pub fn format_measurement(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.2} {}", v, unit),
        None => "n/a".to_string(),
    }
}

/// Multi-line, indented summary of a single reading, as printed by the
/// latest-reading mode.
pub fn format_reading(reading: &Reading, tz: Tz) -> String {
    format!(
        "  key: {}\n  timestamp: {}\n  temperature: {}\n  humidity: {}",
        reading.key,
        format_in_timezone(&reading.timestamp, tz),
        format_measurement(reading.temperature, "°C"),
        format_measurement(reading.humidity, "%"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone as _, Utc};

    #[test]
    fn test_format_measurement_rounds_to_two_places() {
        assert_eq!(format_measurement(Some(-3.005), "°C"), "-3.00 °C");
        assert_eq!(format_measurement(Some(100.0), "%"), "100.00 %");
    }

    #[test]
    fn test_format_reading() {
        let reading = Reading {
            key: "-NxYz".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap(),
            temperature: Some(4.5),
            humidity: None,
        };
        let text = format_reading(&reading, Tz::America__Chicago);
        assert_eq!(
            text,
            "  key: -NxYz\n  timestamp: 2024-01-15 08:00:00 CST\n  temperature: 4.50 °C\n  humidity: n/a"
        );
    }
}
