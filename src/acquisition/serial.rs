//! Serial port discovery and opening
//!
//! Field gateways enumerate as USB CDC/serial adapters. Line settings are
//! fixed at 8N1 with no flow control; only the baud rate is configurable.

use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};

/// One enumerated serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescription {
    pub name: String,
    pub kind: String,
}

fn describe_kind(kind: &SerialPortType) -> String {
    match kind {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("unknown product");
            format!("USB {:04x}:{:04x} ({product})", usb.vid, usb.pid)
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

/// Enumerate serial ports with a short description of each.
pub fn list_ports() -> Result<Vec<PortDescription>, tokio_serial::Error> {
    let ports = tokio_serial::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| PortDescription {
            kind: describe_kind(&p.port_type),
            name: p.port_name,
        })
        .collect())
}

/// Port names for auto-detection, in enumeration order.
///
/// Enumeration failure is logged and treated as "no ports found".
pub fn discover_ports() -> Vec<String> {
    match list_ports() {
        Ok(ports) => {
            let names: Vec<String> = ports.into_iter().map(|p| p.name).collect();
            tracing::debug!(count = names.len(), ports = ?names, "Discovered serial ports");
            names
        }
        Err(e) => {
            tracing::warn!(error = %e, "Serial port enumeration failed");
            Vec::new()
        }
    }
}

/// Open `path` at `baud_rate`, 8N1, no flow control.
pub fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream, tokio_serial::Error> {
    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_kind() {
        assert_eq!(describe_kind(&SerialPortType::PciPort), "PCI");
        assert_eq!(describe_kind(&SerialPortType::Unknown), "unknown");
    }

    #[tokio::test]
    async fn test_open_missing_port_fails() {
        assert!(open_port("/dev/fieldlink-does-not-exist", 9600).is_err());
    }
}
