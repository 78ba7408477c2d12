//! Unified event stream for the monitor
//!
//! Every line task reports through a single channel, so the sink sees M-NET
//! frames and bridge text in the order they were read.

use std::fmt;

use mnet_protocol::DecoderEvent;

/// Identifies one monitored line
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct LineId(pub u32);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.0)
    }
}

/// What a line carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LineKind {
    /// Binary M-NET bus traffic
    Mnet,
    /// ASCII bridge controller protocol
    Bridge,
}

impl LineKind {
    pub fn name(&self) -> &'static str {
        match self {
            LineKind::Mnet => "M-NET",
            LineKind::Bridge => "bridge",
        }
    }
}

/// Everything a line task reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    // -------------------------------------------------------------------------
    // Line lifecycle
    // -------------------------------------------------------------------------
    /// A line task started reading
    LineOpened {
        line: LineId,
        kind: LineKind,
        /// Port name or replay file path
        name: String,
    },

    /// A line task stopped (shutdown, end of input or read error)
    LineClosed { line: LineId },

    // -------------------------------------------------------------------------
    // Traffic
    // -------------------------------------------------------------------------
    /// Output of the M-NET decoder
    Mnet { line: LineId, event: DecoderEvent },

    /// One complete line of bridge text, newline stripped
    BridgeText { line: LineId, text: String },

    // -------------------------------------------------------------------------
    // Errors
    // -------------------------------------------------------------------------
    /// A read failed; the line closes after this
    Error { line: LineId, message: String },
}

impl MonitorEvent {
    /// The line this event came from
    pub fn line(&self) -> LineId {
        match self {
            MonitorEvent::LineOpened { line, .. }
            | MonitorEvent::LineClosed { line }
            | MonitorEvent::Mnet { line, .. }
            | MonitorEvent::BridgeText { line, .. }
            | MonitorEvent::Error { line, .. } => *line,
        }
    }
}
