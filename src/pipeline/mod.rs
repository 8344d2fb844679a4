//! Ingestion Pipeline
//!
//! ```text
//! CONNECTING  acquire the link (explicit port, then discovered candidates)
//! RUNNING     poll → decode → window → log → evaluate → dispatch → report
//! DRAINING    flush the reading log, close both halves of the link
//! CLOSED      terminal
//! ```
//!
//! Cancellation while RUNNING passes through DRAINING like link loss does.

mod state;
pub mod connector;
pub mod processing_loop;

pub use state::*;
pub use connector::{Link, LinkConnector, PairConnector, StdinConnector, StreamConnector};
#[cfg(feature = "serial")]
pub use connector::SerialConnector;
pub use processing_loop::{
    IngestionLoop, IngestionSummary, LineOutcome, StopReason, MAX_CONSECUTIVE_LINK_ERRORS,
};
