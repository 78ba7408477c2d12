//! Error types for M-NET frame assembly and user-supplied input

use thiserror::Error;

/// Recoverable framing faults
///
/// None of these are fatal: the framer reports them as values alongside the
/// byte that caused them and continues from a defined state (`Skipping` or
/// `Idle`). Every variant carries the bytes accumulated when the fault hit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The declared data length does not fit in the frame buffer
    #[error("frame overflow after {} bytes", raw.len())]
    Overflow { raw: Vec<u8> },

    /// Additive sum through the checksum byte was not zero
    #[error("bad checksum: sum 0x{sum:02X} over {} bytes", raw.len())]
    BadChecksum { raw: Vec<u8>, sum: u8 },

    /// The byte after the checksum was neither ACK nor NAK
    #[error("missing handshake: got 0x{byte:02X} instead of ACK or NAK")]
    MissingHandshake { raw: Vec<u8>, byte: u8 },
}

impl FrameError {
    /// Raw bytes accumulated at the time of the fault
    pub fn raw(&self) -> &[u8] {
        match self {
            FrameError::Overflow { raw }
            | FrameError::BadChecksum { raw, .. }
            | FrameError::MissingHandshake { raw, .. } => raw,
        }
    }

    /// Short label used in logs and rendered output
    pub fn kind(&self) -> &'static str {
        match self {
            FrameError::Overflow { .. } => "overflow",
            FrameError::BadChecksum { .. } => "bad checksum",
            FrameError::MissingHandshake { .. } => "missing handshake",
        }
    }
}

/// Errors parsing user-supplied text (filter units, replay dumps)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not a valid unit address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Not a valid hex byte token
    #[error("invalid hex byte: {token:?}")]
    InvalidHex { token: String },

    /// Raw bytes whose length does not match their length byte
    #[error("invalid frame of {len} bytes")]
    InvalidFrame { len: usize },
}
