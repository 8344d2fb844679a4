//! Link acquisition for the ingestion loop.
//!
//! A [`LinkConnector`] produces the two halves of one link: the frame source
//! the loop reads and the command sink it writes. Connectors:
//! - `SerialConnector`: explicit port, then discovered ports (feature `serial`)
//! - `StdinConnector`: frames from stdin, commands to stdout
//! - `StreamConnector`: any bidirectional byte stream
//! - `PairConnector`: a ready-made source and sink

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::acquisition::{FrameSource, LinkError, LinkFrameSource};
use crate::commands::{CommandFraming, CommandSink, LinkCommandSink};
use crate::config::LinkConfig;

/// Both halves of an acquired link
pub struct Link {
    pub name: String,
    pub source: Box<dyn FrameSource>,
    pub sink: Box<dyn CommandSink>,
}

/// Acquires the link while the loop is `CONNECTING`.
#[async_trait]
pub trait LinkConnector: Send {
    /// Open the link. Failing here is fatal for the run.
    async fn connect(&mut self) -> Result<Link, LinkError>;
}

fn split_link<S>(stream: S, name: String, link: &LinkConfig, framing: CommandFraming) -> Link
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    Link {
        source: Box::new(LinkFrameSource::new(
            reader,
            name.clone(),
            link.poll_timeout(),
            link.max_frame_bytes,
        )),
        sink: Box::new(LinkCommandSink::new(writer, framing, link.write_timeout())),
        name,
    }
}

// ============================================================================
// Serial
// ============================================================================

/// Opens the explicit port, then (with auto-detect) each discovered port.
#[cfg(feature = "serial")]
pub struct SerialConnector {
    link: LinkConfig,
    framing: CommandFraming,
}

#[cfg(feature = "serial")]
impl SerialConnector {
    pub fn new(link: LinkConfig, framing: CommandFraming) -> Self {
        Self { link, framing }
    }
}

#[cfg(feature = "serial")]
#[async_trait]
impl LinkConnector for SerialConnector {
    async fn connect(&mut self) -> Result<Link, LinkError> {
        use crate::acquisition::{candidate_ports, discover_ports, open_first, open_port};

        let discovered = if self.link.auto_detect {
            discover_ports()
        } else {
            Vec::new()
        };
        let candidates = candidate_ports(self.link.port.as_deref(), self.link.auto_detect, &discovered);
        let baud_rate = self.link.baud_rate;

        let (stream, name) = open_first(&candidates, |port| open_port(port, baud_rate))?;
        tracing::info!(port = %name, baud = baud_rate, "Serial link ready");

        Ok(split_link(stream, name, &self.link, self.framing))
    }
}

// ============================================================================
// Stdin / stdout
// ============================================================================

/// Reads frames from stdin and writes commands to stdout.
pub struct StdinConnector {
    link: LinkConfig,
    framing: CommandFraming,
}

impl StdinConnector {
    pub fn new(link: LinkConfig, framing: CommandFraming) -> Self {
        Self { link, framing }
    }
}

#[async_trait]
impl LinkConnector for StdinConnector {
    async fn connect(&mut self) -> Result<Link, LinkError> {
        Ok(Link {
            name: "stdin".to_string(),
            source: Box::new(LinkFrameSource::new(
                tokio::io::stdin(),
                "stdin",
                self.link.poll_timeout(),
                self.link.max_frame_bytes,
            )),
            sink: Box::new(LinkCommandSink::new(
                tokio::io::stdout(),
                self.framing,
                self.link.write_timeout(),
            )),
        })
    }
}

// ============================================================================
// Generic streams
// ============================================================================

/// Uses a bidirectional stream handed in by the caller. Connects once.
pub struct StreamConnector<S> {
    stream: Option<S>,
    name: String,
    link: LinkConfig,
    framing: CommandFraming,
}

impl<S> StreamConnector<S> {
    pub fn new(stream: S, name: impl Into<String>, link: LinkConfig, framing: CommandFraming) -> Self {
        Self {
            stream: Some(stream),
            name: name.into(),
            link,
            framing,
        }
    }
}

#[async_trait]
impl<S> LinkConnector for StreamConnector<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn connect(&mut self) -> Result<Link, LinkError> {
        let stream = self.stream.take().ok_or_else(|| LinkError::Unavailable {
            tried: vec![self.name.clone()],
        })?;
        Ok(split_link(stream, self.name.clone(), &self.link, self.framing))
    }
}

/// Hands over a source and sink that are already open. Connects once.
pub struct PairConnector {
    name: String,
    pair: Option<(Box<dyn FrameSource>, Box<dyn CommandSink>)>,
}

impl PairConnector {
    pub fn new(
        name: impl Into<String>,
        source: impl FrameSource + 'static,
        sink: impl CommandSink + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            pair: Some((Box::new(source), Box::new(sink))),
        }
    }
}

#[async_trait]
impl LinkConnector for PairConnector {
    async fn connect(&mut self) -> Result<Link, LinkError> {
        let (source, sink) = self.pair.take().ok_or_else(|| LinkError::Unavailable {
            tried: vec![self.name.clone()],
        })?;
        Ok(Link {
            name: self.name.clone(),
            source,
            sink,
        })
    }
}
