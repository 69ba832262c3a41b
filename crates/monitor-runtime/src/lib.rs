//! Runtime orchestration layer for the sensor monitor.
//!
//! Ties the store, ingestion and window filter together into a single run
//! and exposes the latest-reading lookup used by debug mode.

pub mod data_manager;
pub mod orchestrator;

pub use monitor_core as core;
pub use monitor_data as data;
