//! Anomaly rule limits

use serde::{Deserialize, Serialize};

/// Default limits matching the values the field nodes were commissioned with.
pub mod defaults {
    /// Temperature above this raises an alarm (°C)
    pub const TEMPERATURE_MAX_C: f64 = 30.0;
    /// Humidity below this is abnormal (%)
    pub const HUMIDITY_MIN_PCT: f64 = 40.0;
    /// Humidity above this is abnormal (%)
    pub const HUMIDITY_MAX_PCT: f64 = 70.0;
}

/// Configurable limits for the anomaly evaluator.
///
/// Loaded from the `[thresholds]` section of the station config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// `TEMP_MAX`: strictly greater triggers ALARM_ON + MOTOR_OFF
    pub temperature_max_c: f64,
    /// `UMID_MIN`: strictly lower is a humidity anomaly
    pub humidity_min_pct: f64,
    /// `UMID_MAX`: strictly greater is a humidity anomaly
    pub humidity_max_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature_max_c: defaults::TEMPERATURE_MAX_C,
            humidity_min_pct: defaults::HUMIDITY_MIN_PCT,
            humidity_max_pct: defaults::HUMIDITY_MAX_PCT,
        }
    }
}
