//! Frame assembly
//!
//! The link delivers arbitrary byte chunks. `FrameAssembler` buffers them and
//! yields one candidate line per `\n`, with a trailing `\r` stripped. Bytes
//! that are not valid UTF-8 are replaced rather than failing the line.
//!
//! Memory is bounded: a partial line that grows past `max_frame_bytes` is
//! dropped, together with the rest of that line up to the next newline.

use crate::config::defaults::MAX_FRAME_BYTES;

/// Incremental line splitter for the inbound byte stream.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    max_frame_bytes: usize,
    /// Set while skipping the tail of an overlong line
    discarding: bool,
    overflows: u64,
}

impl FrameAssembler {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            max_frame_bytes: max_frame_bytes.max(1),
            discarding: false,
            overflows: 0,
        }
    }

    /// Feed a chunk of bytes, returning every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else {
                    lines.push(self.take_line());
                }
                self.buffer.clear();
                continue;
            }

            if self.discarding {
                continue;
            }

            self.buffer.push(byte);
            if self.buffer.len() > self.max_frame_bytes {
                self.overflows += 1;
                tracing::debug!(
                    limit = self.max_frame_bytes,
                    "Frame exceeded maximum length, discarding until next newline"
                );
                self.buffer.clear();
                self.discarding = true;
            }
        }

        lines
    }

    /// Flush an unterminated final line (end of stream).
    pub fn finish(&mut self) -> Option<String> {
        if self.discarding {
            self.discarding = false;
            self.buffer.clear();
            return None;
        }
        if self.buffer.is_empty() {
            return None;
        }
        let line = self.take_line();
        self.buffer.clear();
        Some(line)
    }

    /// Bytes currently held for an incomplete line.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of overlong lines dropped so far.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    fn take_line(&self) -> String {
        let bytes = self.buffer.strip_suffix(b"\r").unwrap_or(&self.buffer);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(MAX_FRAME_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_chunks() {
        let mut assembler = FrameAssembler::default();

        assert!(assembler.push(b"{\"n\":\"No").is_empty());
        assert_eq!(assembler.pending_len(), 8);

        let lines = assembler.push(b"de1\"}\r\nnext\npart");
        assert_eq!(lines, vec!["{\"n\":\"Node1\"}".to_string(), "next".to_string()]);
        assert_eq!(assembler.finish(), Some("part".to_string()));
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn test_empty_lines_are_yielded() {
        let mut assembler = FrameAssembler::default();
        assert_eq!(assembler.push(b"\n\r\n"), vec![String::new(), String::new()]);
    }

    #[test]
    fn test_overlong_line_is_dropped_whole() {
        let mut assembler = FrameAssembler::new(8);

        assert!(assembler.push(b"0123456789abc").is_empty());
        assert_eq!(assembler.overflows(), 1);
        assert_eq!(assembler.pending_len(), 0);

        // The tail of the same line is skipped, the next line survives
        let lines = assembler.push(b"def\nok\n");
        assert_eq!(lines, vec!["ok".to_string()]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut assembler = FrameAssembler::default();
        let lines = assembler.push(b"Data \xff{\"t\":1}\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("{\"t\":1}"));
    }
}
