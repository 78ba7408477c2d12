//! M-NET frame model
//!
//! # Frame Format
//! ```text
//! [role] [src] [dst] [unk] [len] [data...] [checksum] [ACK|NAK]
//! ```
//!
//! - `role`: 0xBD command, 0xBE response, 0x3D seen but not understood
//! - `src` / `dst`: unit addresses
//! - `unk`: unclassified fixed byte (usually 0x3F or 0x7F)
//! - `len`: number of data bytes (0-20)
//! - `checksum`: makes the sum of `role..=checksum` zero mod 256
//! - handshake: sent by the addressed unit, not covered by the checksum

use std::fmt;
use std::str::FromStr;

use crate::checksum;
use crate::error::ParseError;

/// Maximum number of data bytes in a frame
pub const MAX_DATA_LEN: usize = 20;
/// Data bytes shown in a hex dump before the rest is elided
pub const DISPLAY_DATA_LEN: usize = 16;
/// Role, source, destination and unclassified byte
pub const HEADER_LEN: usize = 4;
/// Offset of the data-length byte
pub const LENGTH_OFFSET: usize = 4;
/// Offset of the first data byte
pub const DATA_OFFSET: usize = 5;
/// Bytes outside the data field: header, length, checksum, handshake
pub const FRAME_OVERHEAD: usize = 7;
/// Largest frame the buffer holds, handshake byte included
pub const FRAME_CAPACITY: usize = MAX_DATA_LEN + FRAME_OVERHEAD;

/// Positive acknowledgement from the addressed unit
pub const ACK: u8 = 0x06;
/// Negative acknowledgement from the addressed unit
pub const NAK: u8 = 0x21;
/// Reserved address of the bridge controller, displayed as `CM`
pub const BRIDGE_ADDR: u8 = 0xFB;

/// Role byte at the start of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// 0xBD
    Command,
    /// 0xBE
    Response,
    /// 0x3D, observed on the wire with unknown meaning
    Other,
    /// Anything else
    Unrecognized(u8),
}

impl From<u8> for Role {
    fn from(value: u8) -> Self {
        match value {
            0xBD => Role::Command,
            0xBE => Role::Response,
            0x3D => Role::Other,
            other => Role::Unrecognized(other),
        }
    }
}

impl Role {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Role::Command => "cmd",
            Role::Response => "rsp",
            Role::Other => "other",
            Role::Unrecognized(_) => "???",
        }
    }
}

/// A unit address on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address(pub u8);

impl Address {
    /// The reserved bridge endpoint
    pub const BRIDGE: Address = Address(BRIDGE_ADDR);

    /// Whether this is the reserved bridge endpoint
    pub fn is_bridge(&self) -> bool {
        self.0 == BRIDGE_ADDR
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bridge() {
            f.write_str("CM")
        } else {
            write!(f, "{:02X}", self.0)
        }
    }
}

impl From<u8> for Address {
    fn from(value: u8) -> Self {
        Address(value)
    }
}

impl FromStr for Address {
    type Err = ParseError;

    /// Accepts decimal (`5`) or `0x`-prefixed hex (`0x05`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => s.parse::<u8>(),
        };
        parsed
            .map(Address)
            .map_err(|_| ParseError::InvalidAddress(s.to_string()))
    }
}

/// Trailing handshake byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Handshake {
    Ack,
    Nak,
    /// Some other byte sat where the handshake belongs
    Missing(u8),
}

impl From<u8> for Handshake {
    fn from(value: u8) -> Self {
        match value {
            ACK => Handshake::Ack,
            NAK => Handshake::Nak,
            other => Handshake::Missing(other),
        }
    }
}

impl Handshake {
    /// Whether the byte was ACK or NAK
    pub fn is_present(&self) -> bool {
        !matches!(self, Handshake::Missing(_))
    }
}

/// A complete frame, handshake byte included
///
/// Serialized as its raw bytes; deserializing checks the length like
/// [`Frame::from_raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<u8>", into = "Vec<u8>"))]
pub struct Frame {
    raw: Vec<u8>,
}

impl Frame {
    /// Wrap raw bytes whose length matches the declared data length
    ///
    /// The checksum is not verified here; see [`Frame::checksum_valid`].
    pub fn from_raw(raw: Vec<u8>) -> Option<Self> {
        let data_len = *raw.get(LENGTH_OFFSET)? as usize;
        if data_len > MAX_DATA_LEN || raw.len() != data_len + FRAME_OVERHEAD {
            return None;
        }
        Some(Self { raw })
    }

    /// All bytes, role through handshake
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn role(&self) -> Role {
        Role::from(self.raw[0])
    }

    pub fn source(&self) -> Address {
        Address(self.raw[1])
    }

    pub fn destination(&self) -> Address {
        Address(self.raw[2])
    }

    /// The fixed byte after the addresses whose meaning is unknown
    pub fn unclassified(&self) -> u8 {
        self.raw[3]
    }

    pub fn data_len(&self) -> usize {
        self.raw[LENGTH_OFFSET] as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.raw[DATA_OFFSET..DATA_OFFSET + self.data_len()]
    }

    /// Data byte at `index`, zero if out of range
    pub fn data_byte(&self, index: usize) -> u8 {
        self.data().get(index).copied().unwrap_or(0)
    }

    pub fn checksum(&self) -> u8 {
        self.raw[DATA_OFFSET + self.data_len()]
    }

    pub fn handshake(&self) -> Handshake {
        Handshake::from(self.raw[self.raw.len() - 1])
    }

    /// Whether `role..=checksum` sums to zero
    pub fn checksum_valid(&self) -> bool {
        checksum::sum(&self.raw[..self.raw.len() - 1]) == 0
    }
}

impl TryFrom<Vec<u8>> for Frame {
    type Error = ParseError;

    fn try_from(raw: Vec<u8>) -> Result<Self, Self::Error> {
        let len = raw.len();
        Frame::from_raw(raw).ok_or(ParseError::InvalidFrame { len })
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.raw
    }
}

/// Build the bytes of a well-formed frame
///
/// Used to script bus traffic for replays and tests; the checksum is computed
/// and `handshake` is appended after it.
pub fn encode_frame(header: [u8; HEADER_LEN], data: &[u8], handshake: u8) -> Vec<u8> {
    let mut raw = Vec::with_capacity(data.len() + FRAME_OVERHEAD);
    raw.extend_from_slice(&header);
    raw.push(data.len() as u8);
    raw.extend_from_slice(data);
    raw.push(checksum::complement(&raw));
    raw.push(handshake);
    raw
}
