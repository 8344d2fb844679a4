//! Station Configuration - every tunable of the ingestion pipeline as TOML
//!
//! Each struct implements `Default` with the documented values, so a missing
//! file or a missing section behaves exactly like the built-in defaults.

use super::defaults;
use crate::commands::CommandFraming;
use crate::types::Thresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one monitoring station (one shared link).
///
/// Load with `StationConfig::load()` which searches:
/// 1. `$FIELDLINK_CONFIG` env var
/// 2. `./fieldlink.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Nodes always listed in reports
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Serial link settings
    #[serde(default)]
    pub link: LinkConfig,

    /// Anomaly rule limits
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Rolling display window
    #[serde(default)]
    pub window: WindowConfig,

    /// Periodic report generation
    #[serde(default)]
    pub report: ReportConfig,

    /// Reading log backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound command framing
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Diagnostic outputs
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

fn default_nodes() -> Vec<String> {
    defaults::KNOWN_NODES.iter().map(|s| (*s).to_string()).collect()
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            link: LinkConfig::default(),
            thresholds: Thresholds::default(),
            window: WindowConfig::default(),
            report: ReportConfig::default(),
            storage: StorageConfig::default(),
            commands: CommandsConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// `[link]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Explicit port (e.g. "/dev/ttyUSB0", "COM3"); `None` means auto-detect
    pub port: Option<String>,
    /// Probe discovered ports when the explicit port is absent or fails
    pub auto_detect: bool,
    pub baud_rate: u32,
    pub poll_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub max_frame_bytes: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            auto_detect: true,
            baud_rate: defaults::BAUD_RATE,
            poll_timeout_ms: defaults::POLL_TIMEOUT_MS,
            write_timeout_ms: defaults::WRITE_TIMEOUT_MS,
            max_frame_bytes: defaults::MAX_FRAME_BYTES,
        }
    }
}

impl LinkConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// `[window]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Points kept per node (`N`)
    pub size: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: defaults::WINDOW_SIZE,
        }
    }
}

/// `[report]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Reference-node readings between reports (`K`)
    pub every_readings: u64,
    pub reference_node: String,
    pub output_dir: PathBuf,
    /// Also write the JSON rendering (best-effort)
    pub render_json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            every_readings: defaults::REPORT_EVERY_READINGS,
            reference_node: defaults::REFERENCE_NODE.to_string(),
            output_dir: PathBuf::from(defaults::REPORT_DIR),
            render_json: true,
        }
    }
}

/// Reading log backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Flat CSV file with a fixed header row
    #[default]
    Csv,
    /// Embedded sled database
    Sled,
}

/// `[storage]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Backend location; defaults depend on the backend
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured path, or the backend's default location.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| match self.backend {
            StorageBackend::Csv => PathBuf::from(defaults::READING_LOG_CSV),
            StorageBackend::Sled => PathBuf::from(defaults::READING_LOG_SLED),
        })
    }
}

/// `[commands]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub framing: CommandFraming,
}

/// `[diagnostics]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub anomaly_log: PathBuf,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            anomaly_log: PathBuf::from(defaults::ANOMALY_LOG),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl StationConfig {
    /// Load configuration using the standard search order:
    /// 1. `$FIELDLINK_CONFIG` environment variable
    /// 2. `./fieldlink.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded station config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load station config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded station config");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::CONFIG_FILE_NAME);
                }
            }
        }

        info!("No {} found — using built-in defaults", defaults::CONFIG_FILE_NAME);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate for internal consistency.
    ///
    /// Suspicious-but-legal values are logged as warnings; anything that would
    /// make the pipeline misbehave is an error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (mut errors, warnings) = super::validation::validate_physical_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }

        if self.window.size == 0 {
            errors.push("window.size must be at least 1".to_string());
        }
        if self.report.every_readings == 0 {
            errors.push("report.every_readings must be at least 1".to_string());
        }
        if self.report.reference_node.trim().is_empty() {
            errors.push("report.reference_node must not be empty".to_string());
        }
        if self.link.baud_rate == 0 {
            errors.push("link.baud_rate must be positive".to_string());
        }
        if self.link.poll_timeout_ms == 0 {
            errors.push("link.poll_timeout_ms must be positive".to_string());
        }
        if self.link.write_timeout_ms == 0 {
            errors.push("link.write_timeout_ms must be positive".to_string());
        }
        if self.link.max_frame_bytes == 0 {
            errors.push("link.max_frame_bytes must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Config errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[source] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.size, 50);
        assert_eq!(config.report.every_readings, 100);
        assert_eq!(config.report.reference_node, "Node1");
        assert_eq!(config.thresholds.temperature_max_c, 30.0);
        assert_eq!(config.thresholds.humidity_min_pct, 40.0);
        assert_eq!(config.thresholds.humidity_max_pct, 70.0);
        assert_eq!(config.link.baud_rate, 9600);
        assert_eq!(config.commands.framing, CommandFraming::Bare);
        assert_eq!(config.nodes, vec!["Node1", "Node2", "Node3"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = StationConfig::from_toml_str(
            r#"
            [link]
            port = "/dev/ttyUSB1"
            baud_rate = 115200

            [thresholds]
            temperature_max_c = 35.0

            [commands]
            framing = "json"

            [storage]
            backend = "sled"
            "#,
        )
        .unwrap();

        assert_eq!(config.link.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.link.baud_rate, 115_200);
        assert!(config.link.auto_detect);
        assert_eq!(config.thresholds.temperature_max_c, 35.0);
        assert_eq!(config.thresholds.humidity_max_pct, 70.0);
        assert_eq!(config.commands.framing, CommandFraming::Json);
        assert_eq!(config.storage.backend, StorageBackend::Sled);
        assert_eq!(config.storage.resolved_path(), PathBuf::from(defaults::READING_LOG_SLED));
        assert_eq!(config.window.size, 50);
    }

    #[test]
    fn test_inverted_humidity_band_rejected() {
        let err = StationConfig::from_toml_str(
            r#"
            [thresholds]
            humidity_min_pct = 80.0
            humidity_max_pct = 60.0
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("humidity_min_pct"));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = StationConfig::default();
        config.window.size = 0;
        config.report.every_readings = 0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = StationConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = StationConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.report.output_dir, config.report.output_dir);
        assert_eq!(parsed.thresholds, config.thresholds);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err =
            StationConfig::load_from_file(Path::new("/nonexistent/fieldlink.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
