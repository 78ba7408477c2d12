//! Traffic output
//!
//! Decoded traffic goes to the console and to the capture log at the same
//! time, one flush per event so the log is complete if the process dies.

use std::collections::HashMap;
use std::io::{self, Write};

use mnet_protocol::LineRenderer;

use crate::events::{LineId, MonitorEvent};

/// Writes everything to two writers
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// Renders monitor events as text lines
pub struct TrafficSink<W: Write> {
    out: W,
    /// M-NET lines are shifted right when bridge text is interleaved
    beside_bridge: bool,
    renderers: HashMap<LineId, LineRenderer>,
}

impl<W: Write> TrafficSink<W> {
    pub fn new(out: W, beside_bridge: bool) -> Self {
        Self {
            out,
            beside_bridge,
            renderers: HashMap::new(),
        }
    }

    /// Write the lines for one event
    ///
    /// Lifecycle and error events are left to the log; they produce no
    /// traffic output.
    pub fn handle(&mut self, event: &MonitorEvent) -> io::Result<()> {
        match event {
            MonitorEvent::Mnet { line, event } => {
                let beside_bridge = self.beside_bridge;
                let renderer = self.renderers.entry(*line).or_insert_with(|| {
                    if beside_bridge {
                        LineRenderer::beside_bridge()
                    } else {
                        LineRenderer::new()
                    }
                });
                for text in renderer.render(event) {
                    writeln!(self.out, "{}", text)?;
                }
            }
            MonitorEvent::BridgeText { text, .. } => writeln!(self.out, "{}", text)?,
            MonitorEvent::LineOpened { .. }
            | MonitorEvent::LineClosed { .. }
            | MonitorEvent::Error { .. } => return Ok(()),
        }
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
