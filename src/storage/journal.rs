//! Anomaly journal
//!
//! Human-readable diagnostic sink. One line per anomaly event:
//! `YYYY-MM-DD HH:MM:SS - <message>` in local time. Independent of the
//! reading log; a failing journal never stops ingestion.

use crate::types::AnomalyEvent;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const JOURNAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Destination for anomaly events
pub trait DiagnosticSink: Send {
    fn record(&mut self, event: &AnomalyEvent) -> io::Result<()>;
}

/// Format one journal line (without trailing newline).
pub fn journal_line(event: &AnomalyEvent) -> String {
    format!(
        "{} - {}",
        Local::now().format(JOURNAL_TIMESTAMP_FORMAT),
        event.message()
    )
}

/// Append-only journal file
pub struct FileJournal {
    path: PathBuf,
    file: File,
}

impl FileJournal {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for FileJournal {
    fn record(&mut self, event: &AnomalyEvent) -> io::Result<()> {
        writeln!(self.file, "{}", journal_line(event))?;
        self.file.flush()
    }
}

/// In-memory journal; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl DiagnosticSink for MemoryJournal {
    fn record(&mut self, event: &AnomalyEvent) -> io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "journal buffer poisoned"))?;
        lines.push(journal_line(event));
        Ok(())
    }
}
