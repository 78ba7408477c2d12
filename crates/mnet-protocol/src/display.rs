//! Text rendering of decoder events
//!
//! A frame renders as one line:
//!
//! ```text
//!     1.250  BD 01 02 7F 02 25 01 99 06             01->02 get setpoint temp
//! ```
//!
//! elapsed seconds, the raw bytes, padding out to a fixed column, then the
//! endpoints and the decoded description. When a frame answers the one
//! rendered just before it, the source address is blanked.

use std::fmt::Write as _;
use std::time::Duration;

use crate::decode::DecodedFrame;
use crate::decoder::DecoderEvent;
use crate::error::FrameError;
use crate::frame::{Address, Frame, Handshake, DATA_OFFSET, DISPLAY_DATA_LEN};

/// Indent for M-NET lines when bridge text shares the output
pub const BRIDGE_COLUMN: usize = 27;
/// Width the hex dump of a short frame is padded to before the addresses
const ADDRESS_COLUMN: usize = 18;
/// Stands in for data bytes past [`DISPLAY_DATA_LEN`]
const ELIDED: &str = ".. ";

/// Endpoints of the last rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionContext {
    previous: Option<(Address, Address)>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Whether `source -> destination` mirrors the previous frame
    pub fn is_reply(&self, source: Address, destination: Address) -> bool {
        self.previous == Some((destination, source))
    }

    pub fn observe(&mut self, source: Address, destination: Address) {
        self.previous = Some((source, destination));
    }

    pub fn previous(&self) -> Option<(Address, Address)> {
        self.previous
    }
}

/// Renders one line's events, remembering endpoints between frames
#[derive(Debug, Clone, Default)]
pub struct LineRenderer {
    indent: usize,
    session: SessionContext,
}

impl LineRenderer {
    pub fn new() -> Self {
        Self::with_indent(0)
    }

    pub fn with_indent(indent: usize) -> Self {
        Self {
            indent,
            session: SessionContext::new(),
        }
    }

    /// Renderer shifted right of the bridge text column
    pub fn beside_bridge() -> Self {
        Self::with_indent(BRIDGE_COLUMN)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Output lines for one event, without trailing newlines
    pub fn render(&mut self, event: &DecoderEvent) -> Vec<String> {
        match event {
            DecoderEvent::Frame { frame, elapsed } => self.render_frame(frame, *elapsed),
            DecoderEvent::Fault(error) => vec![self.indented(&fault_text(error))],
            DecoderEvent::IdleGap { discarded, .. } if !discarded.is_empty() => {
                vec![self.indented(&format!(
                    "*** idle gap, dropped partial frame: {}",
                    hex_line(discarded)
                ))]
            }
            DecoderEvent::IdleGap { .. } => Vec::new(),
        }
    }

    fn render_frame(&mut self, frame: &DecodedFrame, elapsed: Duration) -> Vec<String> {
        let source = frame.source();
        let destination = frame.destination();

        let mut line = String::new();
        line.push_str(&format_elapsed(elapsed));
        line.push_str(&frame_dump(&frame.frame));
        let shown = frame.frame.data_len().min(DISPLAY_DATA_LEN);
        line.push_str(&" ".repeat(ADDRESS_COLUMN.saturating_sub(3 * shown)));

        if self.session.is_reply(source, destination) {
            line.push_str("  ");
        } else {
            let _ = write!(line, "{}", source);
        }
        let _ = write!(line, "->{} {}", destination, frame.decoded);

        self.session.observe(source, destination);

        let mut lines = vec![self.indented(&line)];
        if frame.frame.handshake() == Handshake::Nak {
            lines.push(self.indented("*** Received NAK"));
        }
        lines
    }

    fn indented(&self, text: &str) -> String {
        format!("{:indent$}{}", "", text, indent = self.indent)
    }
}

fn fault_text(error: &FrameError) -> String {
    match error {
        FrameError::Overflow { raw } => format!("*** too much data: {}", hex_line(raw)),
        FrameError::BadChecksum { raw, sum } => {
            format!("*** bad checksum (sum {:02X}): {}", sum, hex_line(raw))
        }
        FrameError::MissingHandshake { byte, .. } => {
            format!("*** missing ACK or NAK (got {:02X})", byte)
        }
    }
}

/// `"SSSSS.mmm  "`: seconds right-aligned in five columns
pub fn format_elapsed(elapsed: Duration) -> String {
    format!(
        "{:>5}.{:03}  ",
        elapsed.as_secs(),
        elapsed.subsec_millis()
    )
}

/// Each byte as `XX ` (trailing space kept)
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = write!(out, "{:02X} ", b);
    }
    out
}

/// Bytes as space-separated hex, no trailing space
pub fn hex_line(bytes: &[u8]) -> String {
    hex_dump(bytes).trim_end().to_string()
}

/// Hex dump of a frame with the data field clamped for display
pub fn frame_dump(frame: &Frame) -> String {
    let raw = frame.raw();
    let data_len = frame.data_len();
    if data_len <= DISPLAY_DATA_LEN {
        return hex_dump(raw);
    }

    let data_end = DATA_OFFSET + data_len;
    let mut out = hex_dump(&raw[..DATA_OFFSET + DISPLAY_DATA_LEN]);
    out.push_str(ELIDED);
    out.push_str(&hex_dump(&raw[data_end..]));
    out
}
