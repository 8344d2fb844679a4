//! Flat-file Reading Log
//!
//! One CSV row per accepted reading under a fixed header
//! `timestamp,node_id,temperature,humidity`. Timestamps are written as
//! RFC 3339.
//!
//! Logs written by the older station software use the Portuguese header
//! `timestamp,node_id,temperatura,umidade` with `YYYY-MM-DD HH:MM:SS`
//! timestamps (taken as UTC). Such files are read and appended to as they
//! are; their header is never rewritten.
//!
//! Each row is encoded in memory and written to the file in one call, so a
//! failed append leaves nothing buffered for a later append to flush. A row
//! torn by a crash or a failed write is terminated before the next row.

use super::persistence::{LogError, LogScan, ReadingLog};
use crate::types::{LogEntry, Reading};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Header row every CSV reading log starts with
pub const CSV_HEADER: [&str; 4] = ["timestamp", "node_id", "temperature", "humidity"];

/// Header of logs written by the older station software
pub const LEGACY_CSV_HEADER: [&str; 4] = ["timestamp", "node_id", "temperatura", "umidade"];

const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// CSV-backed reading log
pub struct CsvReadingLog {
    path: PathBuf,
    file: File,
    /// The file may end mid-row; terminate it before the next append.
    needs_newline: bool,
}

impl CsvReadingLog {
    /// Open `path` for appending, creating it with the header row if absent
    /// or empty. A file whose first row is neither the header nor the legacy
    /// header is rejected and left as it is.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let has_content = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        if has_content {
            check_header(&path)?;
        }

        let mut file = OpenOptions::new().create(true).read(true).append(true).open(&path)?;

        let needs_newline = if has_content {
            let torn = !ends_with_newline(&mut file)?;
            if torn {
                tracing::warn!(path = %path.display(), "Reading log ends mid-row; next row starts on a new line");
            }
            tracing::info!(path = %path.display(), "Reading log opened (csv)");
            torn
        } else {
            file.write_all(&encode_row(CSV_HEADER)?)?;
            file.sync_data()?;
            tracing::info!(path = %path.display(), "Created reading log (csv)");
            false
        };

        Ok(Self { path, file, needs_newline })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool, LogError> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn encode_row<I, T>(fields: I) -> Result<Vec<u8>, LogError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut row = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    row.write_record(fields)?;
    row.into_inner().map_err(|e| LogError::Io(e.into_error()))
}

fn check_header(path: &Path) -> Result<(), LogError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut first = csv::StringRecord::new();
    reader.read_record(&mut first)?;

    let matches = |header: &[&str]| first.iter().map(str::trim).eq(header.iter().copied());
    if matches(&CSV_HEADER[..]) || matches(&LEGACY_CSV_HEADER[..]) {
        Ok(())
    } else {
        Err(LogError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: CSV_HEADER.join(","),
            found: first.iter().collect::<Vec<_>>().join(","),
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, LogError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| LogError::Corrupt(format!("bad timestamp '{raw}': {e}")))
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, LogError> {
    let raw = record
        .get(index)
        .ok_or_else(|| LogError::Corrupt(format!("row missing {name}")))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|e| LogError::Corrupt(format!("bad {name} '{raw}': {e}")))
}

fn parse_record(record: &csv::StringRecord) -> Result<LogEntry, LogError> {
    let timestamp = record
        .get(0)
        .ok_or_else(|| LogError::Corrupt("row missing timestamp".to_string()))?;
    let node_id = record
        .get(1)
        .ok_or_else(|| LogError::Corrupt("row missing node_id".to_string()))?;

    Ok(LogEntry {
        persisted_at: parse_timestamp(timestamp)?,
        node_id: node_id.to_string(),
        temperature: parse_field(record, 2, "temperature")?,
        humidity: parse_field(record, 3, "humidity")?,
    })
}

impl ReadingLog for CsvReadingLog {
    fn append(&mut self, reading: &Reading) -> Result<(), LogError> {
        let entry = LogEntry::from_reading(reading, Utc::now());

        let mut row = Vec::new();
        if self.needs_newline {
            row.push(b'\n');
        }
        row.extend(encode_row([
            entry.persisted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.node_id,
            entry.temperature.to_string(),
            entry.humidity.to_string(),
        ])?);

        if let Err(e) = self.file.write_all(&row) {
            // Part of the row may have landed
            self.needs_newline = true;
            return Err(e.into());
        }
        self.needs_newline = false;
        self.file.sync_data()?;

        Ok(())
    }

    fn scan(&self) -> Result<LogScan<'_>, LogError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        Ok(Box::new(reader.into_records().map(|record| {
            let record = record?;
            parse_record(&record)
        })))
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.file.sync_data()?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "csv"
    }
}
