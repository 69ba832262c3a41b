//! Chart output for the sensor monitor: an interactive HTML page per series
//! plus an optional static PNG.

pub mod chart;
mod html;

pub use chart::{ChartArtifacts, ChartRenderer, ChartSpec};
