//! Command sink
//!
//! Serializes [`Command`]s onto the write half of the link. Delivery is
//! best-effort: a failed write is reported to the caller, never retried and
//! never queued.
//!
//! Two framings exist in deployed firmware:
//! - `bare`: the action token alone, `ALARM_ON\n`
//! - `json`: an envelope, `{"node":"Node1","command":"ALARM_ON"}\n`

use crate::types::Command;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Command sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("command write failed: {0}")]
    Io(#[from] io::Error),

    #[error("command write timed out after {0:?}")]
    Timeout(Duration),

    #[error("command sink closed")]
    Closed,

    #[error("command encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound line format expected by the node firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandFraming {
    /// Bare action token
    #[default]
    Bare,
    /// `{"node": <id>, "command": <action>}` envelope
    Json,
}

impl CommandFraming {
    /// Encode a command as one newline-terminated line.
    pub fn encode(self, command: &Command) -> Result<String, SinkError> {
        let mut line = match self {
            Self::Bare => command.action.token().to_string(),
            Self::Json => serde_json::to_string(&serde_json::json!({
                "node": command.node_id,
                "command": command.action.token(),
            }))?,
        };
        line.push('\n');
        Ok(line)
    }
}

/// Where outbound commands go.
#[async_trait]
pub trait CommandSink: Send {
    /// Transmit one command. Failures are reported, not retried.
    async fn send(&mut self, command: &Command) -> Result<(), SinkError>;

    /// Release the write side of the link. Called once while draining.
    async fn close(&mut self) {}
}

/// Command sink over any async byte writer (serial write half, stdout).
pub struct LinkCommandSink<W> {
    writer: Option<W>,
    framing: CommandFraming,
    write_timeout: Duration,
}

impl<W: AsyncWrite + Unpin + Send> LinkCommandSink<W> {
    pub fn new(writer: W, framing: CommandFraming, write_timeout: Duration) -> Self {
        Self {
            writer: Some(writer),
            framing,
            write_timeout,
        }
    }

    pub fn framing(&self) -> CommandFraming {
        self.framing
    }

    /// Borrow the underlying writer, if the sink is still open.
    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> CommandSink for LinkCommandSink<W> {
    async fn send(&mut self, command: &Command) -> Result<(), SinkError> {
        let line = self.framing.encode(command)?;
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;

        let write = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        };

        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| SinkError::Timeout(self.write_timeout))??;

        tracing::info!(node = %command.node_id, action = %command.action, "Command sent");
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(error = %e, "Command writer shutdown failed");
            }
        }
    }
}

/// Sink that keeps commands in memory; clones share the buffer.
///
/// Used for dry runs and tests. Can be switched to fail every send.
#[derive(Debug, Clone, Default)]
pub struct RecordingCommandSink {
    sent: Arc<Mutex<Vec<Command>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingCommandSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail as if the link were closed.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandSink for RecordingCommandSink {
    async fn send(&mut self, command: &Command) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        self.sent
            .lock()
            .map_err(|_| SinkError::Closed)?
            .push(command.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;

    #[test]
    fn test_bare_framing() {
        let line = CommandFraming::Bare
            .encode(&Command::new("Node1", Action::AlarmOn))
            .unwrap();
        assert_eq!(line, "ALARM_ON\n");
    }

    #[test]
    fn test_json_framing() {
        let line = CommandFraming::Json
            .encode(&Command::new("Node1", Action::MotorOff))
            .unwrap();
        assert!(line.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["node"], "Node1");
        assert_eq!(value["command"], "MOTOR_OFF");
    }

    #[tokio::test]
    async fn test_sink_writes_lines_in_order() {
        let mut sink = LinkCommandSink::new(Vec::new(), CommandFraming::Bare, Duration::from_secs(1));
        sink.send(&Command::new("Node1", Action::AlarmOn)).await.unwrap();
        sink.send(&Command::new("Node1", Action::MotorOff)).await.unwrap();

        let written = String::from_utf8(sink.get_ref().unwrap().clone()).unwrap();
        assert_eq!(written, "ALARM_ON\nMOTOR_OFF\n");
    }

    #[tokio::test]
    async fn test_send_after_close_is_reported() {
        let mut sink = LinkCommandSink::new(Vec::new(), CommandFraming::Json, Duration::from_secs(1));
        sink.close().await;

        let err = sink.send(&Command::new("Node2", Action::AlarmOn)).await.unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }

    #[tokio::test]
    async fn test_write_to_closed_peer_fails() {
        let (client, server) = tokio::io::duplex(16);
        drop(server);

        let mut sink = LinkCommandSink::new(client, CommandFraming::Bare, Duration::from_secs(1));
        let result = sink.send(&Command::new("Node1", Action::AlarmOn)).await;
        assert!(matches!(result, Err(SinkError::Io(_))));
    }

    #[tokio::test]
    async fn test_recording_sink_shares_buffer() {
        let recorder = RecordingCommandSink::new();
        let mut sink = recorder.clone();
        sink.send(&Command::new("Node1", Action::AlarmOn)).await.unwrap();
        assert_eq!(recorder.sent(), vec![Command::new("Node1", Action::AlarmOn)]);

        recorder.set_failing(true);
        assert!(sink.send(&Command::new("Node1", Action::MotorOff)).await.is_err());
        assert_eq!(recorder.sent().len(), 1);
    }
}
