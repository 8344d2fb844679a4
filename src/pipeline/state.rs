//! Loop State and Ingestion Statistics
//!
//! Shared status of the ingestion loop, readable by a renderer or the CLI
//! while the loop runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Loop State
// ============================================================================

/// Lifecycle of the ingestion loop
///
/// `Connecting → Running → Draining → Closed`. A failed connect goes straight
/// from `Connecting` to `Closed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    #[default]
    Connecting,
    Running,
    Draining,
    Closed,
}

impl LoopState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: LoopState) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Running)
                | (Self::Connecting, Self::Closed)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Connecting => write!(f, "CONNECTING"),
            LoopState::Running => write!(f, "RUNNING"),
            LoopState::Draining => write!(f, "DRAINING"),
            LoopState::Closed => write!(f, "CLOSED"),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters accumulated over one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    /// Candidate frames handed to the decoder
    pub frames_seen: u64,
    pub readings_accepted: u64,
    /// Frames the decoder rejected (noise, partial or incomplete objects)
    pub frames_discarded: u64,
    pub log_write_failures: u64,
    pub anomalies: u64,
    pub journal_failures: u64,
    pub commands_sent: u64,
    pub commands_failed: u64,
    pub reports_written: u64,
    pub report_failures: u64,
    /// Transient link read errors
    pub link_errors: u64,
}

impl std::fmt::Display for IngestionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ingestion: {} frames ({} accepted, {} discarded), {} anomalies, \
             {} commands sent ({} failed), {} log failures, {} reports",
            self.frames_seen,
            self.readings_accepted,
            self.frames_discarded,
            self.anomalies,
            self.commands_sent,
            self.commands_failed,
            self.log_write_failures,
            self.reports_written,
        )
    }
}

// ============================================================================
// Station Status
// ============================================================================

/// Point-in-time view of the running loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationStatus {
    pub state: LoopState,
    /// Name of the acquired link, once connected
    pub link: Option<String>,
    pub stats: IngestionStats,
    pub last_reading_at: Option<DateTime<Utc>>,
}

/// Handle to the status shared between the loop and observers
pub type SharedStatus = Arc<RwLock<StationStatus>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use LoopState::*;
        assert!(Connecting.can_transition_to(Running));
        assert!(Connecting.can_transition_to(Closed));
        assert!(Running.can_transition_to(Draining));
        assert!(Draining.can_transition_to(Closed));

        assert!(!Running.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Running));
        assert!(!Draining.can_transition_to(Running));
        assert!(!Connecting.can_transition_to(Draining));
    }

    #[test]
    fn test_loop_state_display() {
        assert_eq!(format!("{}", LoopState::Connecting), "CONNECTING");
        assert_eq!(format!("{}", LoopState::Running), "RUNNING");
        assert_eq!(format!("{}", LoopState::Draining), "DRAINING");
        assert_eq!(format!("{}", LoopState::Closed), "CLOSED");
        assert!(LoopState::Closed.is_terminal());
    }

    #[test]
    fn test_status_default() {
        let status = StationStatus::default();
        assert_eq!(status.state, LoopState::Connecting);
        assert!(status.link.is_none());
        assert_eq!(status.stats, IngestionStats::default());
    }
}
