//! ReadingLog trait — pluggable storage backend
//!
//! The reading log is the append-only, authoritative history of accepted
//! readings. Backends:
//! - `CsvReadingLog`: flat CSV file with a fixed header row
//! - `SledReadingLog`: single tree in the embedded sled database
//! - `InMemoryReadingLog`: for tests and dry runs, not durable

use crate::types::{LogEntry, Reading};
use chrono::Utc;
use std::path::PathBuf;

/// One traversal of the log, oldest entry first.
pub type LogScan<'a> = Box<dyn Iterator<Item = Result<LogEntry, LogError>> + 'a>;

/// Trait for pluggable reading log backends
///
/// `append` returns only once the entry is durable under the backend's normal
/// semantics. `scan` starts a fresh, independent traversal from the first
/// entry on every call.
pub trait ReadingLog: Send {
    /// Persist one reading, stamped with the current time.
    fn append(&mut self, reading: &Reading) -> Result<(), LogError>;

    /// Traverse every entry in append order.
    fn scan(&self) -> Result<LogScan<'_>, LogError>;

    /// Push any buffered state to storage. Called while draining.
    fn flush(&mut self) -> Result<(), LogError> {
        Ok(())
    }

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Reading log errors
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("reading log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reading log CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("reading log database error: {0}")]
    Database(#[from] sled::Error),

    #[error("reading log serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The existing store was written with a different layout. Never altered.
    #[error("incompatible reading log at {}: expected schema '{expected}', found '{found}'", path.display())]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("corrupt reading log entry: {0}")]
    Corrupt(String),

    #[error("reading log unavailable: {0}")]
    Unavailable(String),
}

/// In-memory reading log for testing and dry runs
///
/// Not durable — data lost on restart. Appends can be made to fail to
/// exercise the degraded path of the ingestion loop.
#[derive(Debug, Default)]
pub struct InMemoryReadingLog {
    entries: Vec<LogEntry>,
    fail_appends: bool,
}

impl InMemoryReadingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail (simulated storage outage).
    pub fn set_fail_appends(&mut self, fail: bool) {
        self.fail_appends = fail;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

impl ReadingLog for InMemoryReadingLog {
    fn append(&mut self, reading: &Reading) -> Result<(), LogError> {
        if self.fail_appends {
            return Err(LogError::Unavailable("in-memory log set to fail".to_string()));
        }
        self.entries.push(LogEntry::from_reading(reading, Utc::now()));
        Ok(())
    }

    fn scan(&self) -> Result<LogScan<'_>, LogError> {
        Ok(Box::new(self.entries.iter().cloned().map(Ok)))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_scan_is_restartable() {
        let mut log = InMemoryReadingLog::new();
        for i in 0..3 {
            let reading = Reading::new(format!("Node{i}"), 20.0 + f64::from(i), 50.0, Utc::now()).unwrap();
            log.append(&reading).unwrap();
        }

        let mut first = log.scan().unwrap();
        assert_eq!(first.next().unwrap().unwrap().node_id, "Node0");

        let second: Vec<String> = log.scan().unwrap().map(|e| e.unwrap().node_id).collect();
        assert_eq!(second, vec!["Node0", "Node1", "Node2"]);
    }

    #[test]
    fn test_in_memory_failing_appends() {
        let mut log = InMemoryReadingLog::new();
        log.set_fail_appends(true);
        let reading = Reading::new("Node1", 20.0, 50.0, Utc::now()).unwrap();
        assert!(matches!(log.append(&reading), Err(LogError::Unavailable(_))));
        assert!(log.entries().is_empty());
    }
}
