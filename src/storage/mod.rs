//! Durable storage
//!
//! The reading log (authoritative history of accepted readings) and the
//! anomaly journal (human-readable diagnostics). The backend is chosen once at
//! startup from `[storage]` configuration.

pub mod csv_log;
pub mod journal;
pub mod persistence;
pub mod sled_log;

pub use csv_log::CsvReadingLog;
pub use journal::{DiagnosticSink, FileJournal, MemoryJournal};
pub use persistence::{InMemoryReadingLog, LogError, LogScan, ReadingLog};
pub use sled_log::SledReadingLog;

use crate::config::{StorageBackend, StorageConfig};

/// Open the configured reading log backend.
pub fn open_reading_log(config: &StorageConfig) -> Result<Box<dyn ReadingLog>, LogError> {
    let path = config.resolved_path();
    let log: Box<dyn ReadingLog> = match config.backend {
        StorageBackend::Csv => Box::new(CsvReadingLog::open(&path)?),
        StorageBackend::Sled => Box::new(SledReadingLog::open(&path)?),
    };
    Ok(log)
}
