//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Configuration discovery
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FIELDLINK_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "fieldlink.toml";

// ============================================================================
// Link
// ============================================================================

/// Serial baud rate used by the field node radios.
pub const BAUD_RATE: u32 = 9600;

/// Bounded wait for inbound bytes per poll (ms).
pub const POLL_TIMEOUT_MS: u64 = 1000;

/// Bounded wait for one outbound command write (ms).
pub const WRITE_TIMEOUT_MS: u64 = 1000;

/// Longest accepted frame (bytes). Longer lines are dropped.
pub const MAX_FRAME_BYTES: usize = 4096;

// ============================================================================
// Pipeline
// ============================================================================

/// Points kept per node in the rolling display window.
pub const WINDOW_SIZE: usize = 50;

/// Reference-node readings between two periodic reports.
pub const REPORT_EVERY_READINGS: u64 = 100;

/// Node whose accepted readings drive the report cadence.
pub const REFERENCE_NODE: &str = "Node1";

/// Nodes always listed in reports, even before their first reading.
pub const KNOWN_NODES: &[&str] = &["Node1", "Node2", "Node3"];

// ============================================================================
// Files
// ============================================================================

/// Flat-file reading log.
pub const READING_LOG_CSV: &str = "dados_sensores.csv";

/// Embedded-store reading log directory.
pub const READING_LOG_SLED: &str = "./data/readings.db";

/// Append-only anomaly journal.
pub const ANOMALY_LOG: &str = "anomalias.log";

/// Directory receiving report artifacts.
pub const REPORT_DIR: &str = "reports";
