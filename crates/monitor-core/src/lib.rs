//! Core types for the sensor monitor.
//!
//! Holds the reading model, the error type, timestamp normalization, timezone
//! handling and CLI time resolution, settings, and display formatting shared
//! by the data, chart and runtime crates.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
