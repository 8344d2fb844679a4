//! Rule agents applied to each accepted reading
//!
//! - **Anomaly Agent**: temperature and humidity limits, producing node
//!   commands and journal events

pub mod anomaly;

pub use anomaly::{evaluate, AgentStats, AnomalyAgent, Evaluation};
