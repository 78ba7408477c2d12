//! Serial line setup
//!
//! The M-NET adapter runs 8E1; the bridge controller's RS-232 port is 8N1.
//! Both default to 9600 baud.

use std::time::Duration;

use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::info;

use crate::error::MonitorError;

/// Framing and speed for one serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl SerialSettings {
    /// 8 data bits, even parity, 1 stop bit
    pub fn mnet(baud: u32) -> Self {
        Self {
            baud,
            data_bits: DataBits::Eight,
            parity: Parity::Even,
            stop_bits: StopBits::One,
        }
    }

    /// 8 data bits, no parity, 1 stop bit
    pub fn bridge(baud: u32) -> Self {
        Self {
            baud,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    /// Short form such as `9600 8E1`
    pub fn describe(&self) -> String {
        let bits = match self.data_bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        };
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        format!("{} {}{}{}", self.baud, bits, parity, stop)
    }
}

/// Open a serial port for passive reading
pub fn open(port_name: &str, settings: SerialSettings) -> Result<SerialStream, MonitorError> {
    info!("Opening {} at {}", port_name, settings.describe());
    let stream = tokio_serial::new(port_name, settings.baud)
        .data_bits(settings.data_bits)
        .parity(settings.parity)
        .stop_bits(settings.stop_bits)
        .timeout(Duration::from_millis(100))
        .open_native_async()?;
    Ok(stream)
}
