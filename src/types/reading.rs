//! Reading, window and log entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated telemetry sample from one field node.
///
/// `temperature` and `humidity` are always finite: a value that fails this is
/// rejected by [`Reading::new`], so a `Reading` that exists is usable as-is.
/// `observed_at` is the time the ingestion loop acquired the frame, not a
/// device timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    node_id: String,
    temperature: f64,
    humidity: f64,
    observed_at: DateTime<Utc>,
}

impl Reading {
    /// Build a reading, returning `None` if either measurement is NaN or infinite.
    pub fn new(
        node_id: impl Into<String>,
        temperature: f64,
        humidity: f64,
        observed_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !temperature.is_finite() || !humidity.is_finite() {
            return None;
        }
        Some(Self {
            node_id: node_id.into(),
            temperature,
            humidity,
            observed_at,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Temperature in °C
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Relative humidity in %
    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Display triple for the rolling window.
    pub fn window_point(&self) -> WindowPoint {
        WindowPoint {
            observed_at: self.observed_at,
            temperature: self.temperature,
            humidity: self.humidity,
        }
    }
}

/// One `(observed_at, temperature, humidity)` point of a node's display window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowPoint {
    pub observed_at: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
}

/// One row of the durable reading log.
///
/// `persisted_at` is stamped by the log at append time. Entries are totally
/// ordered by append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub persisted_at: DateTime<Utc>,
    pub node_id: String,
    pub temperature: f64,
    pub humidity: f64,
}

impl LogEntry {
    /// Build the log row for `reading`, stamped with `persisted_at`.
    pub fn from_reading(reading: &Reading, persisted_at: DateTime<Utc>) -> Self {
        Self {
            persisted_at,
            node_id: reading.node_id().to_string(),
            temperature: reading.temperature(),
            humidity: reading.humidity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_rejects_non_finite() {
        let now = Utc::now();
        assert!(Reading::new("Node1", f64::NAN, 50.0, now).is_none());
        assert!(Reading::new("Node1", 20.0, f64::INFINITY, now).is_none());
        assert!(Reading::new("Node1", f64::NEG_INFINITY, 50.0, now).is_none());

        let reading = Reading::new("Node1", 20.5, 55.0, now).unwrap();
        assert_eq!(reading.node_id(), "Node1");
        assert_eq!(reading.temperature(), 20.5);
        assert_eq!(reading.humidity(), 55.0);
        assert_eq!(reading.observed_at(), now);
    }

    #[test]
    fn test_log_entry_copies_measurements() {
        let observed = Utc::now();
        let reading = Reading::new("Node2", 22.0, 41.0, observed).unwrap();
        let persisted = observed + chrono::Duration::milliseconds(5);
        let entry = LogEntry::from_reading(&reading, persisted);

        assert_eq!(entry.node_id, "Node2");
        assert_eq!(entry.temperature, 22.0);
        assert_eq!(entry.humidity, 41.0);
        assert_eq!(entry.persisted_at, persisted);
    }
}
