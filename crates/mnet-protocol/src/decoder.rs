//! Per-line decoding
//!
//! Wraps a [`Framer`] with the two pieces of glue a poller needs: the
//! edge-triggered idle gap, and the time between displayed frames. The caller
//! supplies the clock so the decoder itself never reads the time.

use std::time::{Duration, Instant};

use crate::decode::DecodedFrame;
use crate::error::FrameError;
use crate::filter::UnitFilter;
use crate::framer::Framer;

/// One poll cycle on a line: a byte, or nothing before the gap timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineInput {
    Byte(u8),
    NoData,
}

/// Something worth reporting from one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// A complete frame that passed the unit filter
    Frame {
        frame: DecodedFrame,
        /// Time since the previous displayed frame on this line
        elapsed: Duration,
    },
    Fault(FrameError),
    /// The line went quiet; any partial frame was dropped
    IdleGap {
        since_last_frame: Option<Duration>,
        discarded: Vec<u8>,
    },
}

/// Time between successive laps, zero on the first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaClock {
    last: Option<Instant>,
}

impl DeltaClock {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Record `now` and return the time since the previous lap
    pub fn lap(&mut self, now: Instant) -> Duration {
        let delta = self.since(now).unwrap_or_default();
        self.last = Some(now);
        delta
    }

    /// Time since the last lap, without recording one
    pub fn since(&self, now: Instant) -> Option<Duration> {
        self.last.map(|last| now.saturating_duration_since(last))
    }
}

#[derive(Debug, Clone)]
pub struct LineDecoder {
    framer: Framer,
    clock: DeltaClock,
    /// Set by any byte, cleared when the gap fires
    gap_armed: bool,
    elapsed: Duration,
}

impl LineDecoder {
    pub fn new(filter: UnitFilter) -> Self {
        Self {
            framer: Framer::new(filter),
            clock: DeltaClock::new(),
            gap_armed: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    pub fn filter(&self) -> UnitFilter {
        self.framer.filter()
    }

    /// Feed one poll cycle observed at `now`
    pub fn push(&mut self, input: LineInput, now: Instant) -> Vec<DecoderEvent> {
        match input {
            LineInput::Byte(byte) => self.byte(byte, now),
            LineInput::NoData => self.no_data(now).into_iter().collect(),
        }
    }

    /// Feed a run of bytes observed at the same instant
    pub fn push_bytes(&mut self, bytes: &[u8], now: Instant) -> Vec<DecoderEvent> {
        bytes
            .iter()
            .flat_map(|&b| self.byte(b, now))
            .collect()
    }

    fn byte(&mut self, byte: u8, now: Instant) -> Vec<DecoderEvent> {
        self.gap_armed = true;
        let step = self.framer.ingest(byte);

        if step.admitted == Some(true) {
            self.elapsed = self.clock.lap(now);
        }

        let mut events = Vec::new();
        if let Some(frame) = step.frame {
            events.push(DecoderEvent::Frame {
                frame: DecodedFrame::new(frame),
                elapsed: self.elapsed,
            });
        }
        if let Some(error) = step.error {
            events.push(DecoderEvent::Fault(error));
        }
        events
    }

    fn no_data(&mut self, now: Instant) -> Option<DecoderEvent> {
        if !self.gap_armed {
            return None;
        }
        self.gap_armed = false;
        Some(DecoderEvent::IdleGap {
            since_last_frame: self.clock.since(now),
            discarded: self.framer.force_idle(),
        })
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(UnitFilter::disabled())
    }
}
