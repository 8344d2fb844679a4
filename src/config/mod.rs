//! Station Configuration Module
//!
//! Provides per-station configuration loaded from a TOML file: link target,
//! anomaly thresholds, window size, report cadence, storage backend and
//! command framing.
//!
//! ## Loading Order
//!
//! 1. `FIELDLINK_CONFIG` environment variable (path to TOML file)
//! 2. `fieldlink.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded `StationConfig` is passed explicitly to every component that
//! needs it; there is no process-wide configuration state.

mod station_config;
pub mod defaults;
pub mod validation;

pub use station_config::*;
