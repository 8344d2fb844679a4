//! Link data acquisition
//!
//! Turns the raw byte stream of the shared serial link into candidate frames
//! and validated readings:
//! - `frame`: cuts bytes into lines with a bounded line length
//! - `decoder`: strict-then-lenient JSON decoding of one frame
//! - `link`: async frame source over any byte reader, error classification
//! - `ports`: ordered candidate probing for link acquisition
//! - `serial`: port enumeration and opening (feature `serial`)

pub mod frame;
pub mod decoder;
pub mod link;
pub mod ports;
#[cfg(feature = "serial")]
pub mod serial;

pub use decoder::{decode, decode_frame, DecodeError};
pub use frame::FrameAssembler;
pub use link::{FrameSource, LinkError, LinkEvent, LinkFrameSource};
pub use ports::{candidate_ports, open_first};
#[cfg(feature = "serial")]
pub use serial::{discover_ports, list_ports, open_port, PortDescription};
