//! Shared data structures for field node telemetry
//!
//! This module defines the values that flow through the ingestion pipeline:
//! - `Reading`: one validated temperature/humidity sample from a node
//! - `WindowPoint`: the display triple kept by the rolling window store
//! - `LogEntry`: one persisted row of the reading log
//! - `Command` / `Action`: outbound instructions to a node
//! - `Thresholds` / `AnomalyEvent`: anomaly rule limits and their findings

mod reading;
mod command;
pub mod thresholds;
mod anomaly;

pub use reading::*;
pub use command::*;
pub use thresholds::*;
pub use anomaly::*;
