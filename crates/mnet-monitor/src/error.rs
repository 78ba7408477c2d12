//! Error types for the line monitor

use mnet_protocol::ParseError;
use thiserror::Error;

/// Errors that can occur while setting up or running the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or configured
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Malformed user input
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Malformed replay dump
    #[error("replay file line {line}: {reason}")]
    Replay { line: usize, reason: String },

    /// Neither a serial line nor a replay file was configured
    #[error("nothing to monitor: give an M-NET port, a bridge port or a replay file")]
    NoLines,

    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),
}
