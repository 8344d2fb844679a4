//! fieldlink: Field Node Telemetry Ingestion
//!
//! Reads temperature/humidity frames from field nodes over one shared serial
//! link, persists every accepted reading and sends alarm commands back when a
//! threshold is crossed.
//!
//! ## Architecture
//!
//! - **Acquisition**: frame assembly and strict-then-lenient JSON decoding
//! - **Window Store**: bounded per-node history for live display
//! - **Storage**: reading log (CSV or sled) and the anomaly journal
//! - **Anomaly Agent**: threshold rules producing node commands
//! - **Commands**: outbound framing and best-effort delivery
//! - **Report**: per-node aggregates over the reading log
//! - **Pipeline**: the `CONNECTING → RUNNING → DRAINING → CLOSED` loop

pub mod acquisition;
pub mod agents;
pub mod commands;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod types;
pub mod window_store;

// Re-export station configuration
pub use config::StationConfig;

// Re-export commonly used types
pub use types::{Action, AnomalyEvent, AnomalyKind, Command, LogEntry, Reading, Thresholds, WindowPoint};

// Re-export the decoder entry point
pub use acquisition::{decode, DecodeError, LinkError};

// Re-export agents
pub use agents::{evaluate, AnomalyAgent, Evaluation};

// Re-export storage
pub use storage::{open_reading_log, CsvReadingLog, LogError, ReadingLog, SledReadingLog};

// Re-export the ingestion loop
pub use pipeline::{IngestionLoop, IngestionStats, IngestionSummary, LoopState};

pub use window_store::{SharedWindowStore, WindowStore};
