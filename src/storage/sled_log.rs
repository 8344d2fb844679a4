//! Embedded Reading Log
//!
//! Persists accepted readings to a sled database. Entries live in the
//! `readings` tree keyed by a monotonic id (big-endian, so iteration order is
//! append order); a `meta` tree carries the schema tag checked on open.

use super::persistence::{LogError, LogScan, ReadingLog};
use crate::types::{LogEntry, Reading};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Schema tag written on first open
pub const SLED_SCHEMA: &str = "fieldlink.readings.v1";

const READINGS_TREE: &str = "readings";
const META_TREE: &str = "meta";
const SCHEMA_KEY: &[u8] = b"schema";

/// sled-backed reading log
pub struct SledReadingLog {
    db: sled::Db,
    readings: sled::Tree,
    path: PathBuf,
}

impl SledReadingLog {
    /// Open or create the log at `path`.
    ///
    /// A database carrying a different schema tag, or one with entries but no
    /// tag at all, is rejected without being modified.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)?;
        let meta = db.open_tree(META_TREE)?;
        let readings = db.open_tree(READINGS_TREE)?;

        match meta.get(SCHEMA_KEY)? {
            Some(tag) if tag.as_ref() == SLED_SCHEMA.as_bytes() => {}
            Some(tag) => {
                return Err(LogError::SchemaMismatch {
                    path,
                    expected: SLED_SCHEMA.to_string(),
                    found: String::from_utf8_lossy(&tag).into_owned(),
                });
            }
            None if !readings.is_empty() => {
                return Err(LogError::SchemaMismatch {
                    path,
                    expected: SLED_SCHEMA.to_string(),
                    found: "untagged".to_string(),
                });
            }
            None => {
                meta.insert(SCHEMA_KEY, SLED_SCHEMA.as_bytes())?;
                db.flush()?;
            }
        }

        tracing::info!(path = %path.display(), entries = readings.len(), "Reading log opened (sled)");

        Ok(Self { db, readings, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored entries
    pub fn count(&self) -> usize {
        self.readings.len()
    }
}

impl ReadingLog for SledReadingLog {
    fn append(&mut self, reading: &Reading) -> Result<(), LogError> {
        let entry = LogEntry::from_reading(reading, Utc::now());

        // Monotonic across restarts; big-endian keeps iteration in append order
        let key = self.db.generate_id()?.to_be_bytes();
        let value = serde_json::to_vec(&entry)?;

        self.readings.insert(key, value)?;
        self.readings.flush()?;

        Ok(())
    }

    fn scan(&self) -> Result<LogScan<'_>, LogError> {
        Ok(Box::new(self.readings.iter().map(|item| {
            let (_key, value) = item?;
            serde_json::from_slice::<LogEntry>(&value).map_err(LogError::from)
        })))
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.db.flush()?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}
