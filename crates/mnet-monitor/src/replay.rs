//! Replay of captured M-NET traffic
//!
//! A capture is plain text: whitespace-separated hex bytes of one or two
//! digits, e.g.
//!
//! ```text
//! BD 01 02 7F 02 25 01 99 06
//! BE 02 01 7F 05 25 81 01 95 00 ...
//! ```
//!
//! Replayed bytes run through the same line reader as a serial port, so the
//! end of the file looks like a quiet line and flushes any trailing partial
//! frame.

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use mnet_protocol::{DecoderEvent, LineDecoder, LineInput, ParseError};
use tracing::info;

use crate::error::MonitorError;

/// Parse one hex token of one or two digits
pub fn parse_hex_byte(token: &str) -> Result<u8, ParseError> {
    let valid = (1..=2).contains(&token.len()) && token.chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ParseError::InvalidHex {
            token: token.to_string(),
        });
    }
    u8::from_str_radix(token, 16).map_err(|_| ParseError::InvalidHex {
        token: token.to_string(),
    })
}

/// Parse a whole capture, reporting the line of the first bad token
pub fn parse_capture(text: &str) -> Result<Vec<u8>, MonitorError> {
    let mut bytes = Vec::new();
    for (index, line) in text.lines().enumerate() {
        for token in line.split_whitespace() {
            let byte = parse_hex_byte(token).map_err(|e| MonitorError::Replay {
                line: index + 1,
                reason: e.to_string(),
            })?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}

/// Read and parse a capture file
pub fn load_capture(path: &Path) -> Result<Vec<u8>, MonitorError> {
    let text = std::fs::read_to_string(path)?;
    let bytes = parse_capture(&text)?;
    info!("Loaded {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Capture bytes as an async reader for [`MnetLineReader`](crate::MnetLineReader)
pub fn capture_reader(bytes: Vec<u8>) -> Cursor<Vec<u8>> {
    Cursor::new(bytes)
}

/// Poll cycles for a capture: every byte in order, then one idle cycle
pub fn replay_inputs(bytes: &[u8]) -> impl Iterator<Item = LineInput> + '_ {
    bytes
        .iter()
        .map(|&b| LineInput::Byte(b))
        .chain(std::iter::once(LineInput::NoData))
}

/// Decode a capture synchronously
pub fn replay(bytes: &[u8], decoder: &mut LineDecoder) -> Vec<DecoderEvent> {
    let now = Instant::now();
    replay_inputs(bytes)
        .flat_map(|input| decoder.push(input, now))
        .collect()
}
