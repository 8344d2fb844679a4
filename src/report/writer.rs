//! Durable report artifacts

use super::{render_json, render_text, Report, ReportError};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths written for one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub text: PathBuf,
    /// `None` when the JSON rendering is disabled or failed
    pub json: Option<PathBuf>,
}

/// Writes `report_<YYYYmmdd_HHMMSS>.txt` (and `.json`) under a directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    render_json: bool,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, render_json: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            render_json,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the text artifact, then the JSON one best-effort.
    ///
    /// Only a failure on the text artifact is an error.
    pub fn write(&self, report: &Report) -> Result<ReportArtifacts, ReportError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| io_error(&self.output_dir, e))?;

        let stem = self.unused_stem(report);
        let text_path = self.output_dir.join(format!("{stem}.txt"));
        fs::write(&text_path, render_text(report)).map_err(|e| io_error(&text_path, e))?;

        let json = if self.render_json {
            let json_path = self.output_dir.join(format!("{stem}.json"));
            let written = render_json(report)
                .map_err(std::io::Error::from)
                .and_then(|doc| fs::write(&json_path, doc));
            match written {
                Ok(()) => Some(json_path),
                Err(e) => {
                    tracing::warn!(path = %json_path.display(), error = %e, "JSON report not written");
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(path = %text_path.display(), entries = report.total_entries(), "Report written");

        Ok(ReportArtifacts {
            text: text_path,
            json,
        })
    }

    /// `report_<stamp>`, suffixed if a report from the same second exists.
    fn unused_stem(&self, report: &Report) -> String {
        let base = format!("report_{}", report.generated_at.format("%Y%m%d_%H%M%S"));
        let taken = |stem: &str| self.output_dir.join(format!("{stem}.txt")).exists();

        let mut stem = base.clone();
        let mut n = 0u32;
        while taken(&stem) {
            n += 1;
            stem = format!("{base}_{n}");
        }
        stem
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.display().to_string(),
        source,
    }
}
