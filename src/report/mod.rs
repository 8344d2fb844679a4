//! Report Generator
//!
//! Aggregates the reading log into per-node statistics. The log is the only
//! input: the rolling window is a display cache and never feeds a report.
//!
//! A node with no entries still appears (if it is one of the configured
//! nodes) with every aggregate undefined, held as `NaN` here and rendered as
//! `undefined` / `null`.

mod render;
mod writer;

pub use render::{render_json, render_text};
pub use writer::{ReportArtifacts, ReportWriter};

use crate::storage::{LogError, ReadingLog};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;

/// Report generation errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to scan reading log: {0}")]
    Log(#[from] LogError),

    #[error("failed to write report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregates for one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStats {
    pub count: u64,
    pub mean_temperature: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub mean_humidity: f64,
}

impl NodeStats {
    /// Stats for a node with no entries.
    pub fn undefined() -> Self {
        Self {
            count: 0,
            mean_temperature: f64::NAN,
            max_temperature: f64::NAN,
            min_temperature: f64::NAN,
            mean_humidity: f64::NAN,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.count > 0
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    count: u64,
    sum_temperature: f64,
    sum_humidity: f64,
    max_temperature: f64,
    min_temperature: f64,
}

impl Accumulator {
    fn add(&mut self, temperature: f64, humidity: f64) {
        if self.count == 0 {
            self.max_temperature = temperature;
            self.min_temperature = temperature;
        } else {
            self.max_temperature = self.max_temperature.max(temperature);
            self.min_temperature = self.min_temperature.min(temperature);
        }
        self.count += 1;
        self.sum_temperature += temperature;
        self.sum_humidity += humidity;
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&self) -> NodeStats {
        if self.count == 0 {
            return NodeStats::undefined();
        }
        let n = self.count as f64;
        NodeStats {
            count: self.count,
            mean_temperature: self.sum_temperature / n,
            max_temperature: self.max_temperature,
            min_temperature: self.min_temperature,
            mean_humidity: self.sum_humidity / n,
        }
    }
}

/// Per-node summary of the reading log at one point in time
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub nodes: BTreeMap<String, NodeStats>,
    /// Log entries that could not be read back and were left out
    pub skipped_entries: u64,
}

impl Report {
    pub fn node(&self, node_id: &str) -> Option<&NodeStats> {
        self.nodes.get(node_id)
    }

    /// Total entries aggregated across all nodes
    pub fn total_entries(&self) -> u64 {
        self.nodes.values().map(|s| s.count).sum()
    }
}

/// Scan `log` from the beginning and aggregate per node.
///
/// Every node in `known_nodes` is present in the result even with no entries;
/// nodes seen only in the log are added alongside. Unreadable entries are
/// skipped and counted rather than failing the whole report.
pub fn generate(log: &dyn ReadingLog, known_nodes: &[String]) -> Result<Report, ReportError> {
    let mut accumulators: BTreeMap<String, Accumulator> = known_nodes
        .iter()
        .map(|node| (node.clone(), Accumulator::default()))
        .collect();
    let mut skipped_entries = 0;

    for entry in log.scan()? {
        match entry {
            Ok(entry) => accumulators
                .entry(entry.node_id)
                .or_default()
                .add(entry.temperature, entry.humidity),
            Err(e) => {
                skipped_entries += 1;
                tracing::warn!(error = %e, "Skipping unreadable log entry in report");
            }
        }
    }

    Ok(Report {
        generated_at: Local::now(),
        nodes: accumulators
            .into_iter()
            .map(|(node, acc)| (node, acc.finish()))
            .collect(),
        skipped_entries,
    })
}
