//! Time-series chart rendering.
//!
//! Each chart is written twice: an HTML page embedding an SVG rendering
//! (the authoritative, browsable artifact) and, best effort, a PNG.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use monitor_core::error::{MonitorError, Result};
use monitor_core::models::Reading;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{info, warn};

use crate::html::html_page;

/// One `(instant, value)` sample; `None` leaves a gap in the line.
pub type Point = (DateTime<Utc>, Option<f64>);

// ── ChartSpec ─────────────────────────────────────────────────────────────────

/// Title, labels and output name of one chart.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub y_label: String,
    /// Output file name without extension.
    pub file_stem: String,
    pub color: RGBColor,
}

impl ChartSpec {
    pub fn temperature() -> Self {
        Self {
            title: "Temperature".to_string(),
            y_label: "Temperature (°C)".to_string(),
            file_stem: "temperature".to_string(),
            color: RGBColor(214, 39, 40),
        }
    }

    pub fn humidity() -> Self {
        Self {
            title: "Humidity".to_string(),
            y_label: "Humidity (%)".to_string(),
            file_stem: "humidity".to_string(),
            color: RGBColor(31, 119, 180),
        }
    }
}

/// Files produced for one chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifacts {
    pub html: PathBuf,
    /// `None` when PNG export was disabled or failed.
    pub png: Option<PathBuf>,
}

// ── ChartRenderer ─────────────────────────────────────────────────────────────

/// Writes charts into `out_dir`, labelling the time axis in `display_tz`.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    out_dir: PathBuf,
    display_tz: Tz,
    size: (u32, u32),
    export_png: bool,
}

impl ChartRenderer {
    pub fn new(out_dir: impl Into<PathBuf>, display_tz: Tz) -> Self {
        Self {
            out_dir: out_dir.into(),
            display_tz,
            size: (1200, 600),
            export_png: true,
        }
    }

    /// Enable or disable the PNG export.
    pub fn with_png(mut self, export_png: bool) -> Self {
        self.export_png = export_png;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Render the temperature and humidity charts for `readings`.
    ///
    /// Nothing is written for an empty slice.
    pub fn render_readings(&self, readings: &[Reading]) -> Result<Vec<ChartArtifacts>> {
        if readings.is_empty() {
            warn!("No data to plot.");
            return Ok(Vec::new());
        }

        let temperature: Vec<Point> = readings
            .iter()
            .map(|r| (r.timestamp, r.temperature))
            .collect();
        let humidity: Vec<Point> = readings.iter().map(|r| (r.timestamp, r.humidity)).collect();

        Ok(vec![
            self.render(&ChartSpec::temperature(), &temperature)?,
            self.render(&ChartSpec::humidity(), &humidity)?,
        ])
    }

    /// Render a single chart. The HTML artifact is mandatory; the PNG is not.
    pub fn render(&self, spec: &ChartSpec, points: &[Point]) -> Result<ChartArtifacts> {
        if points.is_empty() {
            return Err(MonitorError::Chart(format!("no points for {}", spec.title)));
        }
        std::fs::create_dir_all(&self.out_dir)?;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size).into_drawing_area();
            draw_chart(&root, spec, points, self.display_tz, Text::Labelled)
                .map_err(|e| MonitorError::Chart(e.to_string()))?;
        }

        let html_path = self.out_dir.join(format!("{}.html", spec.file_stem));
        std::fs::write(&html_path, html_page(spec, &svg, points, self.display_tz))?;
        info!("Saved interactive plot: {}", html_path.display());

        let png = if self.export_png {
            let png_path = self.out_dir.join(format!("{}.png", spec.file_stem));
            match self.write_png(&png_path, spec, points) {
                Ok(()) => {
                    info!("Saved static image: {}", png_path.display());
                    Some(png_path)
                }
                Err(e) => {
                    warn!("PNG export failed for {}: {}", png_path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        Ok(ChartArtifacts {
            html: html_path,
            png,
        })
    }

    /// Write the PNG, dropping all text if the labelled rendering fails
    /// (no usable system font, for instance).
    fn write_png(&self, path: &Path, spec: &ChartSpec, points: &[Point]) -> Result<()> {
        match self.try_png(path, spec, points, Text::Labelled) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Labelled PNG failed ({}); retrying without text", e);
                self.try_png(path, spec, points, Text::Bare)
            }
        }
    }

    /// One PNG attempt. Panics inside plotters are turned into errors.
    fn try_png(&self, path: &Path, spec: &ChartSpec, points: &[Point], text: Text) -> Result<()> {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            let root = BitMapBackend::new(path, self.size).into_drawing_area();
            draw_chart(&root, spec, points, self.display_tz, text)
                .map_err(|e| MonitorError::Chart(e.to_string()))
        }));
        attempt.unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(MonitorError::Chart(format!("plotters panicked: {}", reason)))
        })
    }
}

// ── Drawing ───────────────────────────────────────────────────────────────────

/// Whether a rendering carries caption, axis titles and tick labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Text {
    Labelled,
    /// Plot area, grid and series only; nothing goes through the font engine.
    Bare,
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    points: &[Point],
    tz: Tz,
    text: Text,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let (x_start, x_end) = time_range(points);
    let (y_min, y_max) = value_range(points);

    let mut builder = ChartBuilder::on(root);
    builder.margin(20).x_label_area_size(50).y_label_area_size(70);
    if text == Text::Labelled {
        builder.caption(&spec.title, ("sans-serif", 28));
    }
    let mut chart = builder.build_cartesian_2d(x_start..x_end, y_min..y_max)?;

    let label_time = |x: &DateTime<Utc>| x.with_timezone(&tz).format("%m-%d %H:%M").to_string();
    let mut mesh = chart.configure_mesh();
    match text {
        Text::Labelled => {
            mesh.x_desc(format!("Time ({})", tz.name()))
                .y_desc(spec.y_label.as_str())
                .x_label_formatter(&label_time);
        }
        Text::Bare => {
            mesh.x_labels(0).y_labels(0);
        }
    }
    mesh.draw()?;

    let line_style = spec.color.stroke_width(2);
    for run in contiguous_runs(points) {
        chart.draw_series(LineSeries::new(run, line_style))?;
    }
    chart.draw_series(
        points
            .iter()
            .filter_map(|(t, v)| v.map(|v| Circle::new((*t, v), 3, spec.color.filled()))),
    )?;

    root.present()?;
    Ok(())
}

/// First and last instant; a single instant is widened by 30 minutes each way.
fn time_range(points: &[Point]) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = points.iter().map(|(t, _)| *t).min().unwrap_or_else(Utc::now);
    let last = points.iter().map(|(t, _)| *t).max().unwrap_or(first);
    if first == last {
        (first - Duration::minutes(30), last + Duration::minutes(30))
    } else {
        (first, last)
    }
}

/// Value extent padded by 10% (or ±1 for a flat series); `0..1` when empty.
fn value_range(points: &[Point]) -> (f64, f64) {
    let (min, max) = points
        .iter()
        .filter_map(|(_, v)| *v)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    let pad = if span > 0.0 { span * 0.1 } else { 1.0 };
    (min - pad, max + pad)
}

/// Split the series at missing values so gaps are not bridged by a line.
fn contiguous_runs(points: &[Point]) -> Vec<Vec<(DateTime<Utc>, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (t, v) in points {
        match v {
            Some(v) => current.push((*t, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

// ── Tests ──────────────────────────────────────────────────────────────────────
