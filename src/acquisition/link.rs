//! Frame source abstraction for the shared link.
//!
//! The ingestion loop reads frames through [`FrameSource`]; production uses
//! [`LinkFrameSource`] over the read half of a serial port (or stdin), tests
//! use any in-memory reader.

use super::frame::FrameAssembler;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Link errors
#[derive(Debug, Error)]
pub enum LinkError {
    /// No candidate port could be opened at startup.
    #[error("no link available (tried: {})", describe_tried(tried))]
    Unavailable { tried: Vec<String> },

    /// The link is permanently gone (unplugged, closed by peer).
    #[error("link lost: {0}")]
    Lost(String),

    /// Transient read failure; the next poll may succeed.
    #[error("link I/O error: {0}")]
    Io(#[source] io::Error),
}

impl LinkError {
    /// Classify a read error as permanent loss or a transient failure.
    pub fn from_io(err: io::Error) -> Self {
        if device_gone(&err) {
            return Self::Lost(err.to_string());
        }
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied => Self::Lost(err.to_string()),
            _ => Self::Io(err),
        }
    }

    /// Whether the loop must stop reading and drain.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Lost(_))
    }
}

/// An unplugged USB-serial adapter fails reads with EIO, ENXIO or ENODEV.
#[cfg(unix)]
fn device_gone(err: &io::Error) -> bool {
    const EIO: i32 = 5;
    const ENXIO: i32 = 6;
    const ENODEV: i32 = 19;
    matches!(err.raw_os_error(), Some(EIO | ENXIO | ENODEV))
}

#[cfg(not(unix))]
fn device_gone(_err: &io::Error) -> bool {
    false
}

fn describe_tried(tried: &[String]) -> String {
    if tried.is_empty() {
        "none".to_string()
    } else {
        tried.join(", ")
    }
}

/// Outcome of one bounded poll of the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A complete candidate frame.
    Line(String),
    /// Nothing ready within the poll timeout. Not an error.
    Idle,
    /// End of stream: the peer closed the link.
    Closed,
}

/// Where inbound frames come from.
///
/// `next_event` must be cancel-safe: the loop races it against shutdown in a
/// `select!`, and a cancelled poll must not lose buffered bytes.
#[async_trait]
pub trait FrameSource: Send {
    /// Poll for the next frame, waiting at most the source's poll timeout.
    async fn next_event(&mut self) -> Result<LinkEvent, LinkError>;

    /// Release the link. Called once while draining.
    async fn close(&mut self) {}

    /// Human-readable name for logging (e.g. "/dev/ttyUSB0", "stdin").
    fn source_name(&self) -> &str;
}

/// Size of one raw read from the link.
const READ_CHUNK_BYTES: usize = 512;

/// Frame source over any async byte reader.
pub struct LinkFrameSource<R> {
    reader: Option<R>,
    name: String,
    assembler: FrameAssembler,
    ready: VecDeque<String>,
    poll_timeout: Duration,
    chunk: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin + Send> LinkFrameSource<R> {
    pub fn new(
        reader: R,
        name: impl Into<String>,
        poll_timeout: Duration,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            reader: Some(reader),
            name: name.into(),
            assembler: FrameAssembler::new(max_frame_bytes),
            ready: VecDeque::new(),
            poll_timeout,
            chunk: vec![0u8; READ_CHUNK_BYTES],
            eof: false,
        }
    }

    /// Frames dropped for exceeding the maximum length.
    pub fn overflows(&self) -> u64 {
        self.assembler.overflows()
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameSource for LinkFrameSource<R> {
    async fn next_event(&mut self) -> Result<LinkEvent, LinkError> {
        if let Some(line) = self.ready.pop_front() {
            return Ok(LinkEvent::Line(line));
        }
        if self.eof {
            return Ok(LinkEvent::Closed);
        }

        let Some(reader) = self.reader.as_mut() else {
            return Ok(LinkEvent::Closed);
        };

        // read() is cancel-safe; partial lines stay in the assembler
        let read = tokio::time::timeout(self.poll_timeout, reader.read(&mut self.chunk)).await;

        match read {
            Err(_) => Ok(LinkEvent::Idle),
            Ok(Ok(0)) => {
                self.eof = true;
                match self.assembler.finish() {
                    Some(line) => Ok(LinkEvent::Line(line)),
                    None => Ok(LinkEvent::Closed),
                }
            }
            Ok(Ok(n)) => {
                let lines = self.assembler.push(&self.chunk[..n]);
                self.ready.extend(lines);
                Ok(self.ready.pop_front().map_or(LinkEvent::Idle, LinkEvent::Line))
            }
            Ok(Err(e)) => Err(LinkError::from_io(e)),
        }
    }

    async fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::info!(link = %self.name, "Link reader closed");
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_lines_then_closed() {
        let data: &[u8] = b"first\nsecond\nthird";
        let mut source = LinkFrameSource::new(data, "test", Duration::from_millis(50), 1024);

        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Line("first".into()));
        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Line("second".into()));
        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Line("third".into()));
        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Closed);
        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Closed);
    }

    #[tokio::test]
    async fn test_idle_when_nothing_ready() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut source = LinkFrameSource::new(server, "duplex", Duration::from_millis(20), 1024);

        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Idle);

        client.write_all(b"par").await.unwrap();
        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Idle);
        client.write_all(b"tial\n").await.unwrap();
        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Line("partial".into()));

        drop(client);
        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Closed);
    }

    #[test]
    fn test_error_classification() {
        let lost = LinkError::from_io(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        assert!(lost.is_fatal());

        let transient = LinkError::from_io(io::Error::new(io::ErrorKind::TimedOut, "busy"));
        assert!(!transient.is_fatal());

        let unavailable = LinkError::Unavailable { tried: vec!["/dev/ttyUSB0".into()] };
        assert!(unavailable.is_fatal());
        assert_eq!(unavailable.to_string(), "no link available (tried: /dev/ttyUSB0)");
    }

    #[cfg(unix)]
    #[test]
    fn test_unplugged_adapter_errnos_are_fatal() {
        // EIO, ENXIO, ENODEV
        for errno in [5, 6, 19] {
            let err = LinkError::from_io(io::Error::from_raw_os_error(errno));
            assert!(err.is_fatal(), "errno {errno} should mean the link is gone");
        }

        // EAGAIN stays transient
        let again = LinkError::from_io(io::Error::from_raw_os_error(11));
        assert!(!again.is_fatal());
    }

    #[tokio::test]
    async fn test_frames_split_across_reads_and_link_loss() {
        let mock = tokio_test::io::Builder::new()
            .read(b"{\"n\":\"Node1\",")
            .read(b"\"t\":20,\"u\":50}\r\nnoise")
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            .build();
        let mut source = LinkFrameSource::new(mock, "mock", Duration::from_millis(50), 1024);

        assert_eq!(source.next_event().await.unwrap(), LinkEvent::Idle);
        assert_eq!(
            source.next_event().await.unwrap(),
            LinkEvent::Line("{\"n\":\"Node1\",\"t\":20,\"u\":50}".into())
        );

        let err = source.next_event().await.unwrap_err();
        assert!(err.is_fatal());
    }
}
