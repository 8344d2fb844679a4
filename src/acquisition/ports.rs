//! Link candidate selection
//!
//! The link is acquired by trying candidates in order and keeping the first
//! that opens: the explicit target (if any), then, when auto-detection is on,
//! every discovered port.

use super::link::LinkError;
use std::fmt::Display;
use tracing::{info, warn};

/// Ordered list of ports to try.
///
/// The explicit target comes first; discovered ports follow only when
/// `auto_detect` is set, without repeating the explicit target.
pub fn candidate_ports(
    explicit: Option<&str>,
    auto_detect: bool,
    discovered: &[String],
) -> Vec<String> {
    let mut candidates: Vec<String> = explicit.map(str::to_string).into_iter().collect();

    if auto_detect {
        for port in discovered {
            if !candidates.iter().any(|c| c == port) {
                candidates.push(port.clone());
            }
        }
    }

    candidates
}

/// Open the first candidate that succeeds.
///
/// Returns the opened handle and the name of the port it came from, or
/// [`LinkError::Unavailable`] listing every port tried.
pub fn open_first<T, E: Display>(
    candidates: &[String],
    mut open: impl FnMut(&str) -> Result<T, E>,
) -> Result<(T, String), LinkError> {
    for port in candidates {
        match open(port) {
            Ok(handle) => {
                info!(port = %port, "Link opened");
                return Ok((handle, port.clone()));
            }
            Err(e) => {
                warn!(port = %port, error = %e, "Failed to open link candidate");
            }
        }
    }

    Err(LinkError::Unavailable {
        tried: candidates.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explicit_first_then_discovered() {
        let discovered = ports(&["/dev/ttyUSB0", "/dev/ttyACM0"]);
        assert_eq!(
            candidate_ports(Some("/dev/ttyACM0"), true, &discovered),
            ports(&["/dev/ttyACM0", "/dev/ttyUSB0"])
        );
        assert_eq!(
            candidate_ports(Some("COM3"), false, &discovered),
            ports(&["COM3"])
        );
        assert_eq!(candidate_ports(None, true, &discovered), discovered);
        assert!(candidate_ports(None, false, &discovered).is_empty());
    }

    #[test]
    fn test_open_first_skips_failures() {
        let candidates = ports(&["a", "b", "c"]);
        let mut attempts = Vec::new();

        let (handle, port) = open_first(&candidates, |name| {
            attempts.push(name.to_string());
            if name == "b" {
                Ok(42)
            } else {
                Err("busy")
            }
        })
        .unwrap();

        assert_eq!(handle, 42);
        assert_eq!(port, "b");
        assert_eq!(attempts, ports(&["a", "b"]));
    }

    #[test]
    fn test_open_first_reports_all_tried() {
        let candidates = ports(&["a", "b"]);
        let err = open_first::<(), _>(&candidates, |_| Err("busy")).unwrap_err();

        match err {
            LinkError::Unavailable { tried } => assert_eq!(tried, candidates),
            other => panic!("unexpected error: {other}"),
        }
    }
}
