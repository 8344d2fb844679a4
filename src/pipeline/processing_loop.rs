//! Ingestion loop shared by every link type.
//!
//! One reader drives each accepted reading through
//! window → log → evaluate → dispatch strictly in sequence, so no two
//! readings are ever processed concurrently. The only suspension point that
//! races cancellation is the bounded poll of the link.

use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connector::LinkConnector;
use super::{IngestionStats, LoopState, SharedStatus};
use crate::acquisition::{decode_frame, LinkError, LinkEvent};
use crate::agents::AnomalyAgent;
use crate::commands::CommandSink;
use crate::config::StationConfig;
use crate::report::{self, ReportWriter};
use crate::storage::{DiagnosticSink, ReadingLog};
use crate::window_store::{SharedWindowStore, WindowStore};

// ============================================================================
// Outcomes
// ============================================================================

/// What happened to one candidate frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not a reading; nothing changed.
    Discarded,
    Accepted {
        anomalies: usize,
        commands_sent: usize,
        report_written: bool,
    },
}

/// Why the loop left `RUNNING`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested.
    Cancelled,
    /// The peer closed the link (end of stream).
    LinkClosed,
    /// The link failed permanently.
    LinkLost(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::LinkClosed => write!(f, "link closed by peer"),
            StopReason::LinkLost(e) => write!(f, "link lost: {e}"),
        }
    }
}

/// Result of a completed run
/// Transient read failures in a row before the link is treated as lost.
pub const MAX_CONSECUTIVE_LINK_ERRORS: u32 = 10;

#[derive(Debug, Clone)]
pub struct IngestionSummary {
    pub link: String,
    pub stop_reason: StopReason,
    pub stats: IngestionStats,
}

// ============================================================================
// Ingestion Loop
// ============================================================================

/// Owns everything one run of the ingestion loop needs.
///
/// Built with [`new()`](IngestionLoop::new), optionally given a shared window
/// via [`with_window()`](IngestionLoop::with_window), then consumed by
/// [`run()`](IngestionLoop::run).
pub struct IngestionLoop {
    agent: AnomalyAgent,
    window: SharedWindowStore,
    log: Box<dyn ReadingLog>,
    journal: Box<dyn DiagnosticSink>,
    reports: ReportWriter,
    known_nodes: Vec<String>,
    reference_node: String,
    report_every: u64,
    reference_readings: u64,
    stats: IngestionStats,
    status: SharedStatus,
    retry_delay: Duration,
    cancel_token: CancellationToken,
}

impl IngestionLoop {
    pub fn new(
        config: &StationConfig,
        log: Box<dyn ReadingLog>,
        journal: Box<dyn DiagnosticSink>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            agent: AnomalyAgent::new(config.thresholds),
            window: WindowStore::shared(config.window.size),
            log,
            journal,
            reports: ReportWriter::new(config.report.output_dir.clone(), config.report.render_json),
            known_nodes: config.nodes.clone(),
            reference_node: config.report.reference_node.clone(),
            report_every: config.report.every_readings.max(1),
            reference_readings: 0,
            stats: IngestionStats::default(),
            status: SharedStatus::default(),
            retry_delay: config.link.poll_timeout(),
            cancel_token,
        }
    }

    /// Use an externally owned window store (e.g. one a renderer also holds).
    pub fn with_window(mut self, window: SharedWindowStore) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> SharedWindowStore {
        self.window.clone()
    }

    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    pub fn stats(&self) -> IngestionStats {
        self.stats
    }

    async fn set_state(&mut self, next: LoopState) {
        let mut status = self.status.write().await;
        if !status.state.can_transition_to(next) {
            warn!(from = %status.state, to = %next, "Unexpected loop state transition");
        }
        info!(from = %status.state, to = %next, "Ingestion loop state");
        status.state = next;
        status.stats = self.stats;
    }

    /// Acquire the link and ingest until cancellation or link loss.
    ///
    /// Only a failure to acquire the link is returned as an error; everything
    /// after that is contained and counted in the summary.
    pub async fn run<C: LinkConnector + ?Sized>(
        mut self,
        connector: &mut C,
    ) -> Result<IngestionSummary, LinkError> {
        info!(
            reference_node = %self.reference_node,
            every = self.report_every,
            "Periodic reports count readings from the reference node only; \
             if it stops reporting, no periodic report is written"
        );

        let mut link = match connector.connect().await {
            Ok(link) => link,
            Err(e) => {
                tracing::error!(error = %e, "Link acquisition failed");
                self.set_state(LoopState::Closed).await;
                return Err(e);
            }
        };

        self.status.write().await.link = Some(link.name.clone());
        self.set_state(LoopState::Running).await;
        info!(link = %link.name, log = self.log.backend_name(), "Ingesting frames");

        let mut consecutive_errors = 0u32;
        let stop_reason = loop {
            let event = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Shutdown signal received");
                    break StopReason::Cancelled;
                }
                result = link.source.next_event() => result,
            };

            if event.is_ok() {
                consecutive_errors = 0;
            }

            match event {
                Ok(LinkEvent::Line(line)) => {
                    self.process_line(&line, link.sink.as_mut()).await;
                }
                Ok(LinkEvent::Idle) => {}
                Ok(LinkEvent::Closed) => {
                    info!(link = %link.name, "Link closed by peer");
                    break StopReason::LinkClosed;
                }
                Err(e) if e.is_fatal() => {
                    warn!(link = %link.name, error = %e, "Link lost");
                    break StopReason::LinkLost(e.to_string());
                }
                Err(e) => {
                    self.stats.link_errors += 1;
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_LINK_ERRORS {
                        warn!(link = %link.name, error = %e, consecutive_errors, "Link keeps failing, giving up");
                        break StopReason::LinkLost(format!(
                            "{consecutive_errors} consecutive read errors, last: {e}"
                        ));
                    }
                    warn!(link = %link.name, error = %e, consecutive_errors, "Link read failed, polling again");

                    // Wait one poll timeout before polling a failing link again
                    tokio::select! {
                        _ = self.cancel_token.cancelled() => {
                            info!("Shutdown signal received");
                            break StopReason::Cancelled;
                        }
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        };

        self.set_state(LoopState::Draining).await;
        if let Err(e) = self.log.flush() {
            warn!(error = %e, "Reading log flush failed while draining");
        }
        link.sink.close().await;
        link.source.close().await;
        self.set_state(LoopState::Closed).await;

        info!(reason = %stop_reason, "{}", self.stats);

        Ok(IngestionSummary {
            link: link.name,
            stop_reason,
            stats: self.stats,
        })
    }

    /// Push one candidate frame through the pipeline.
    ///
    /// Failures past decoding (log, journal, command, report) are counted and
    /// logged; none of them stops the remaining steps.
    pub async fn process_line(&mut self, line: &str, sink: &mut dyn CommandSink) -> LineOutcome {
        self.stats.frames_seen += 1;

        let reading = match decode_frame(line, Utc::now()) {
            Ok(reading) => reading,
            Err(reason) => {
                self.stats.frames_discarded += 1;
                debug!(reason = %reason, "Frame discarded");
                self.publish(None).await;
                return LineOutcome::Discarded;
            }
        };

        self.stats.readings_accepted += 1;
        debug!(
            node = reading.node_id(),
            temperature = reading.temperature(),
            humidity = reading.humidity(),
            "Reading accepted"
        );

        self.window.write().await.record(&reading);

        if let Err(e) = self.log.append(&reading) {
            self.stats.log_write_failures += 1;
            warn!(node = reading.node_id(), error = %e, "Reading log write failed");
        }

        let evaluation = self.agent.evaluate(&reading);

        for event in &evaluation.warnings {
            self.stats.anomalies += 1;
            warn!(node = %event.node_id, "{}", event.message());
            if let Err(e) = self.journal.record(event) {
                self.stats.journal_failures += 1;
                warn!(error = %e, "Anomaly journal write failed");
            }
        }

        let mut commands_sent = 0;
        for command in &evaluation.commands {
            match sink.send(command).await {
                Ok(()) => {
                    self.stats.commands_sent += 1;
                    commands_sent += 1;
                }
                Err(e) => {
                    self.stats.commands_failed += 1;
                    warn!(command = %command, error = %e, "Command dropped");
                }
            }
        }

        let mut report_written = false;
        if reading.node_id() == self.reference_node {
            self.reference_readings += 1;
            if self.reference_readings % self.report_every == 0 {
                report_written = self.write_report();
            }
        }

        self.publish(Some(reading.observed_at())).await;

        LineOutcome::Accepted {
            anomalies: evaluation.warnings.len(),
            commands_sent,
            report_written,
        }
    }

    fn write_report(&mut self) -> bool {
        let written = report::generate(self.log.as_ref(), &self.known_nodes)
            .and_then(|report| self.reports.write(&report));

        match written {
            Ok(artifacts) => {
                self.stats.reports_written += 1;
                debug!(path = %artifacts.text.display(), "Periodic report written");
                true
            }
            Err(e) => {
                self.stats.report_failures += 1;
                warn!(error = %e, "Periodic report failed");
                false
            }
        }
    }

    async fn publish(&mut self, reading_at: Option<chrono::DateTime<Utc>>) {
        let mut status = self.status.write().await;
        status.stats = self.stats;
        if reading_at.is_some() {
            status.last_reading_at = reading_at;
        }
    }
}
