//! Serial port listing for `--list-ports`

use std::fmt;

use serialport::{available_ports, SerialPortType};
use tracing::debug;

use crate::error::MonitorError;

/// Port names containing these never carry RS-485 adapters
const SKIPPED: &[&str] = &["Bluetooth", "debug"];

/// A serial port the monitor could open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// e.g. /dev/ttyUSB0, COM3
    pub name: String,
    pub usb: Option<UsbDetails>,
}

/// Identification of a USB serial adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDetails {
    pub vid: u16,
    pub pid: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl PortInfo {
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        let usb = match port_type {
            SerialPortType::UsbPort(usb) => Some(UsbDetails {
                vid: usb.vid,
                pid: usb.pid,
                manufacturer: usb.manufacturer.clone(),
                product: usb.product.clone(),
            }),
            _ => None,
        };
        Self { name, usb }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.usb {
            Some(usb) => write!(
                f,
                "{} - {} [{:04x}:{:04x}]",
                self.name,
                usb.product.as_deref().unwrap_or("USB serial"),
                usb.vid,
                usb.pid
            ),
            None => f.write_str(&self.name),
        }
    }
}

fn skipped(name: &str) -> bool {
    SKIPPED.iter().any(|pattern| name.contains(pattern))
}

/// Enumerate available serial ports
pub fn list_ports() -> Result<Vec<PortInfo>, MonitorError> {
    let ports = available_ports().map_err(|e| MonitorError::EnumerationFailed(e.to_string()))?;
    let result: Vec<_> = ports
        .into_iter()
        .filter(|p| !skipped(&p.port_name))
        .map(|p| PortInfo::from_serialport(p.port_name, &p.port_type))
        .collect();
    debug!("Found {} serial port(s)", result.len());
    Ok(result)
}
