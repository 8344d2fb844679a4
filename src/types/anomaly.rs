//! Anomaly events emitted by the evaluator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What rule a reading violated, with the value and limits involved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnomalyKind {
    HighTemperature { value: f64, limit: f64 },
    HumidityOutOfRange { value: f64, min: f64, max: f64 },
}

/// A domain event, not an error: a reading crossed a configured threshold.
///
/// Recorded to the anomaly journal whether or not a command is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub node_id: String,
    pub kind: AnomalyKind,
    pub observed_at: DateTime<Utc>,
}

impl AnomalyEvent {
    /// One-line human message for the journal.
    pub fn message(&self) -> String {
        match self.kind {
            AnomalyKind::HighTemperature { value, .. } => {
                format!("High temperature on {}: {value}°C", self.node_id)
            }
            AnomalyKind::HumidityOutOfRange { value, .. } => {
                format!("Abnormal humidity on {}: {value}%", self.node_id)
            }
        }
    }

    pub fn is_temperature(&self) -> bool {
        matches!(self.kind, AnomalyKind::HighTemperature { .. })
    }

    pub fn is_humidity(&self) -> bool {
        matches!(self.kind, AnomalyKind::HumidityOutOfRange { .. })
    }
}

impl fmt::Display for AnomalyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
