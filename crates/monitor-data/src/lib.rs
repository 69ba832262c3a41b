//! Data layer for the sensor monitor.
//!
//! Responsible for reading raw entries from the key-value store, turning
//! them into ordered [`Reading`](monitor_core::models::Reading)s and
//! selecting the ones inside a time window.

pub mod analysis;
pub mod reader;
pub mod store;

pub use monitor_core as core;
