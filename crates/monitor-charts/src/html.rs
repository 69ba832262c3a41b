//! Standalone HTML page wrapping an SVG chart and its data table.

use std::fmt::Write as _;

use chrono_tz::Tz;
use monitor_core::formatting::format_measurement;
use monitor_core::time_utils::format_in_timezone;

use crate::chart::{ChartSpec, Point};

const STYLE: &str = "body{font-family:sans-serif;margin:24px;color:#222}\
table{border-collapse:collapse;margin-top:16px}\
td,th{padding:4px 12px;border-bottom:1px solid #ddd;text-align:left}\
tr:hover td{background:#f3f6fa}\
.chart svg{max-width:100%;height:auto}";

/// Build the page for one chart. Rows of the table are highlighted on hover.
pub(crate) fn html_page(spec: &ChartSpec, svg: &str, points: &[Point], tz: Tz) -> String {
    let title = escape(&spec.title);
    let unit = unit_of(&spec.y_label);

    let mut rows = String::new();
    for (t, v) in points {
        let _ = writeln!(
            rows,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&format_in_timezone(t, tz)),
            escape(&format_measurement(*v, unit))
        );
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
<h1>{title}</h1>\n<div class=\"chart\">{svg}</div>\n\
<table>\n<thead><tr><th>Time ({tz})</th><th>{label}</th></tr></thead>\n\
<tbody>\n{rows}</tbody>\n</table>\n</body>\n</html>\n",
        tz = escape(tz.name()),
        label = escape(&spec.y_label),
    )
}

/// The text between the last pair of parentheses, e.g. `%` for `Humidity (%)`.
fn unit_of(label: &str) -> &str {
    match (label.rfind('('), label.rfind(')')) {
        (Some(open), Some(close)) if open < close => &label[open + 1..close],
        _ => "",
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone as _, Utc};

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
    }

    #[test]
    fn test_unit_of() {
        assert_eq!(unit_of("Humidity (%)"), "%");
        assert_eq!(unit_of("Temperature (°C)"), "°C");
        assert_eq!(unit_of("Plain"), "");
    }

    #[test]
    fn test_page_lists_readings_in_display_timezone() {
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 15, 0, 0).unwrap();
        let page = html_page(
            &ChartSpec::humidity(),
            "<svg></svg>",
            &[(t, Some(55.0)), (t, None)],
            Tz::America__Chicago,
        );
        assert!(page.contains("<div class=\"chart\"><svg></svg></div>"));
        assert!(page.contains("2024-07-01 10:00:00 CDT"));
        assert!(page.contains("55.00 %"));
        assert!(page.contains("n/a"));
        assert!(page.contains("tr:hover"));
    }
}
