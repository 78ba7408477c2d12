//! Byte-at-a-time frame reassembly
//!
//! The framer sees every byte on the line exactly once, in order, with no
//! lookahead. Frame boundaries come from the data-length byte; the additive
//! checksum is checked at the byte after the data, and the byte after that
//! must be the receiver's ACK or NAK.
//!
//! # Resynchronization
//!
//! | Fault | Recovery |
//! |---|---|
//! | data length > 20 | `Overflow`, skip until an ACK/NAK-valued byte |
//! | checksum sum != 0 | `BadChecksum`, skip exactly the handshake byte |
//! | handshake byte not ACK/NAK | `MissingHandshake`, that byte starts the next frame |
//! | idle line | [`Framer::force_idle`] drops any partial frame |
//!
//! After a length overflow the position of the real handshake byte is unknown,
//! so the skip ends on its value instead.

use tracing::{debug, trace};

use crate::checksum::Checksum;
use crate::error::FrameError;
use crate::filter::UnitFilter;
use crate::frame::{
    Address, Frame, Handshake, DATA_OFFSET, FRAME_CAPACITY, HEADER_LEN, LENGTH_OFFSET,
    MAX_DATA_LEN,
};

/// Why the framer is discarding bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Overflow,
    BadChecksum,
}

/// Where the framer is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No bytes of a frame yet
    Idle,
    /// Role, addresses and unclassified byte, then the data-length byte
    Header,
    Data,
    ExpectChecksum,
    ExpectHandshake,
    Skipping(SkipReason),
}

/// Outcome of feeding one byte
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct Ingested {
    /// Unit filter verdict, set on the byte that completes the header
    pub admitted: Option<bool>,
    /// A complete frame that passed the filter
    pub frame: Option<Frame>,
    pub error: Option<FrameError>,
    /// Byte re-used as the first byte of the next frame
    pub carried: Option<u8>,
}

/// Frame reassembly state for one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framer {
    filter: UnitFilter,
    buffer: Vec<u8>,
    checksum: Checksum,
    phase: Phase,
    admitted: bool,
}

impl Framer {
    pub fn new(filter: UnitFilter) -> Self {
        Self {
            filter,
            buffer: Vec::with_capacity(FRAME_CAPACITY),
            checksum: Checksum::new(),
            phase: Phase::Idle,
            admitted: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Bytes of the frame in progress
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    pub fn filter(&self) -> UnitFilter {
        self.filter
    }

    /// Feed the next byte from the line
    pub fn ingest(&mut self, byte: u8) -> Ingested {
        match self.phase {
            Phase::Skipping(reason) => self.skip(byte, reason),
            Phase::ExpectHandshake => self.complete(byte),
            Phase::Idle | Phase::Header => {
                self.accept(byte);
                self.header_byte(byte)
            }
            Phase::Data => {
                self.accept(byte);
                if self.buffer.len() == DATA_OFFSET + self.data_len() {
                    self.phase = Phase::ExpectChecksum;
                }
                Ingested::default()
            }
            Phase::ExpectChecksum => {
                self.accept(byte);
                self.verify()
            }
        }
    }

    /// Drop any frame in progress and return to `Idle`
    ///
    /// Returns the discarded bytes. Also ends a skip.
    pub fn force_idle(&mut self) -> Vec<u8> {
        let discarded = self.buffer.clone();
        if !discarded.is_empty() {
            debug!(bytes = discarded.len(), phase = ?self.phase, "idle gap: dropping partial frame");
        }
        self.reset();
        discarded
    }

    fn accept(&mut self, byte: u8) {
        self.checksum.add(byte);
        self.buffer.push(byte);
    }

    fn data_len(&self) -> usize {
        self.buffer
            .get(LENGTH_OFFSET)
            .map(|&len| len as usize)
            .unwrap_or(0)
    }

    fn header_byte(&mut self, byte: u8) -> Ingested {
        self.phase = Phase::Header;
        let mut out = Ingested::default();

        match self.buffer.len() {
            HEADER_LEN => {
                let source = Address(self.buffer[1]);
                let destination = Address(self.buffer[2]);
                self.admitted = self.filter.passes(source, destination);
                out.admitted = Some(self.admitted);
            }
            len if len == LENGTH_OFFSET + 1 => {
                let data_len = byte as usize;
                if data_len > MAX_DATA_LEN {
                    debug!(data_len, "declared data length exceeds frame buffer");
                    out.error = Some(FrameError::Overflow {
                        raw: self.buffer.clone(),
                    });
                    self.checksum.reset();
                    self.phase = Phase::Skipping(SkipReason::Overflow);
                } else if data_len == 0 {
                    self.phase = Phase::ExpectChecksum;
                } else {
                    self.phase = Phase::Data;
                }
            }
            _ => {}
        }
        out
    }

    fn verify(&mut self) -> Ingested {
        if self.checksum.is_valid() {
            self.phase = Phase::ExpectHandshake;
            return Ingested::default();
        }

        let sum = self.checksum.sum();
        debug!(sum, bytes = ?self.buffer, "bad checksum");
        self.checksum.reset();
        self.phase = Phase::Skipping(SkipReason::BadChecksum);
        Ingested {
            error: Some(FrameError::BadChecksum {
                raw: self.buffer.clone(),
                sum,
            }),
            ..Default::default()
        }
    }

    fn complete(&mut self, byte: u8) -> Ingested {
        self.buffer.push(byte);
        let frame = if self.admitted {
            Frame::from_raw(self.buffer.clone())
        } else {
            trace!(bytes = ?self.buffer, "frame suppressed by unit filter");
            None
        };
        self.finish(byte, frame)
    }

    fn skip(&mut self, byte: u8, reason: SkipReason) -> Ingested {
        if self.buffer.len() < FRAME_CAPACITY {
            self.buffer.push(byte);
        }
        let ends = match reason {
            // The byte after a bad checksum sits where the handshake belongs
            SkipReason::BadChecksum => true,
            SkipReason::Overflow => Handshake::from(byte).is_present(),
        };
        if ends {
            self.finish(byte, None)
        } else {
            Ingested::default()
        }
    }

    /// Close out the current frame on its handshake-position byte
    fn finish(&mut self, byte: u8, frame: Option<Frame>) -> Ingested {
        let mut out = Ingested {
            frame,
            ..Default::default()
        };

        match Handshake::from(byte) {
            Handshake::Missing(carried) => {
                debug!(byte = carried, "missing ACK or NAK, starting next frame with it");
                out.error = Some(FrameError::MissingHandshake {
                    raw: self.buffer.clone(),
                    byte: carried,
                });
                self.reset();
                self.seed(carried);
                out.carried = Some(carried);
            }
            Handshake::Ack | Handshake::Nak => self.reset(),
        }
        out
    }

    fn seed(&mut self, byte: u8) {
        self.buffer.push(byte);
        self.checksum = Checksum::seeded(byte);
        self.phase = Phase::Header;
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.checksum.reset();
        self.phase = Phase::Idle;
        self.admitted = false;
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(UnitFilter::disabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_frame, ACK, NAK};
    use proptest::prelude::*;

    const GET_SETPOINT: [u8; 4] = [0xBD, 0x01, 0x02, 0x7F];

    fn feed(framer: &mut Framer, bytes: &[u8]) -> Vec<Ingested> {
        bytes.iter().map(|&b| framer.ingest(b)).collect()
    }

    fn frames(steps: &[Ingested]) -> Vec<Frame> {
        steps.iter().filter_map(|s| s.frame.clone()).collect()
    }

    fn errors(steps: &[Ingested]) -> Vec<FrameError> {
        steps.iter().filter_map(|s| s.error.clone()).collect()
    }

    #[test]
    fn test_valid_frame() {
        let mut framer = Framer::default();
        let raw = encode_frame(GET_SETPOINT, &[0x25, 0x01], ACK);
        let steps = feed(&mut framer, &raw);

        let got = frames(&steps);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].raw(), raw.as_slice());
        assert!(errors(&steps).is_empty());
        assert_eq!(framer, Framer::default());
    }

    #[test]
    fn test_phases() {
        let mut framer = Framer::default();
        let raw = encode_frame(GET_SETPOINT, &[0x25, 0x01], ACK);
        let mut phases = Vec::new();
        for &b in &raw {
            let _ = framer.ingest(b);
            phases.push(framer.phase());
        }
        assert_eq!(
            phases,
            vec![
                Phase::Header,
                Phase::Header,
                Phase::Header,
                Phase::Header,
                Phase::Data,
                Phase::Data,
                Phase::ExpectChecksum,
                Phase::ExpectHandshake,
                Phase::Idle,
            ]
        );
    }

    #[test]
    fn test_filter_verdict_latched_on_fourth_byte() {
        let mut framer = Framer::default();
        let raw = encode_frame(GET_SETPOINT, &[0x25, 0x01], ACK);
        let steps = feed(&mut framer, &raw);
        let verdicts: Vec<_> = steps.iter().map(|s| s.admitted).collect();
        assert_eq!(verdicts[3], Some(true));
        assert_eq!(verdicts.iter().filter(|v| v.is_some()).count(), 1);
    }

    #[test]
    fn test_zero_length_frame() {
        let mut framer = Framer::default();
        let raw = encode_frame([0xBE, 0x02, 0x01, 0x3F], &[], ACK);
        assert_eq!(raw.len(), 7);
        let got = frames(&feed(&mut framer, &raw));
        assert_eq!(got.len(), 1);
        assert!(got[0].data().is_empty());
    }

    #[test]
    fn test_max_length_frame_fits() {
        let mut framer = Framer::default();
        let data = [0x11u8; MAX_DATA_LEN];
        let raw = encode_frame(GET_SETPOINT, &data, ACK);
        assert_eq!(raw.len(), FRAME_CAPACITY);
        let steps = feed(&mut framer, &raw);
        assert_eq!(frames(&steps).len(), 1);
        assert!(errors(&steps).is_empty());
    }

    #[test]
    fn test_nak_still_yields_frame() {
        let mut framer = Framer::default();
        let raw = encode_frame(GET_SETPOINT, &[0x25, 0x01], NAK);
        let got = frames(&feed(&mut framer, &raw));
        assert_eq!(got[0].handshake(), Handshake::Nak);
        assert!(framer.is_idle());
    }

    #[test]
    fn test_bad_checksum_then_ack() {
        let mut framer = Framer::default();
        let mut raw = encode_frame(GET_SETPOINT, &[0x25, 0x01], ACK);
        raw[7] ^= 0xFF;

        let steps = feed(&mut framer, &raw[..8]);
        let errs = errors(&steps);
        assert_eq!(errs.len(), 1);
        match &errs[0] {
            FrameError::BadChecksum { raw: bytes, .. } => assert_eq!(bytes, &raw[..8]),
            other => panic!("expected BadChecksum, got {:?}", other),
        }
        assert_eq!(framer.phase(), Phase::Skipping(SkipReason::BadChecksum));
        assert_eq!(framer.buffered(), &raw[..8]);
        assert!(framer.checksum().is_valid());

        let step = framer.ingest(ACK);
        assert!(step.frame.is_none());
        assert!(step.error.is_none());
        assert_eq!(framer, Framer::default());
    }

    #[test]
    fn test_bad_checksum_then_non_handshake_byte() {
        let mut framer = Framer::default();
        let mut raw = encode_frame(GET_SETPOINT, &[0x25, 0x01], ACK);
        raw[7] = raw[7].wrapping_add(1);
        raw[8] = 0xBD;

        let steps = feed(&mut framer, &raw);
        let errs = errors(&steps);
        assert_eq!(errs.len(), 2);
        assert!(matches!(errs[1], FrameError::MissingHandshake { byte: 0xBD, .. }));
        assert_eq!(steps[8].carried, Some(0xBD));
        assert_eq!(framer.buffered(), &[0xBD]);
        assert_eq!(framer.checksum().sum(), 0xBD);
        assert_eq!(framer.phase(), Phase::Header);
    }

    #[test]
    fn test_missing_handshake_carries_into_next_frame() {
        let mut framer = Framer::default();
        let first = encode_frame(GET_SETPOINT, &[0x25, 0x01], ACK);
        let second = encode_frame([0xBE, 0x02, 0x01, 0x7F], &[0x25, 0x81, 0x01, 0x95, 0x00], ACK);

        // First frame loses its ACK; the second frame's role byte takes its place
        let mut stream = first[..first.len() - 1].to_vec();
        stream.extend_from_slice(&second);

        let steps = feed(&mut framer, &stream);
        let got = frames(&steps);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].handshake(), Handshake::Missing(0xBE));
        assert_eq!(got[1].raw(), second.as_slice());

        let errs = errors(&steps);
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], FrameError::MissingHandshake { byte: 0xBE, .. }));
        assert!(framer.is_idle());
    }

    #[test]
    fn test_overflow_reported_once() {
        let mut framer = Framer::default();
        let mut stream = vec![0xBD, 0x01, 0x02, 0x7F, 21];
        stream.extend(std::iter::repeat(0x55).take(40));

        let steps = feed(&mut framer, &stream);
        let errs = errors(&steps);
        assert_eq!(errs.len(), 1);
        match &errs[0] {
            FrameError::Overflow { raw } => assert_eq!(raw, &[0xBD, 0x01, 0x02, 0x7F, 21]),
            other => panic!("expected Overflow, got {:?}", other),
        }
        assert_eq!(framer.phase(), Phase::Skipping(SkipReason::Overflow));
        assert_eq!(framer.buffered().len(), FRAME_CAPACITY);

        let step = framer.ingest(ACK);
        assert!(step.error.is_none());
        assert_eq!(framer, Framer::default());
    }

    #[test]
    fn test_overflow_skip_ends_on_nak() {
        let mut framer = Framer::default();
        let _ = feed(&mut framer, &[0xBD, 0x01, 0x02, 0x7F, 0xFF, 0x10, 0x20]);
        let _ = framer.ingest(NAK);
        assert!(framer.is_idle());
    }

    #[test]
    fn test_filtered_frame_is_consumed_silently() {
        let mut framer = Framer::new(UnitFilter::unit(Address(7)));
        let raw = encode_frame([0xBD, 0x03, 0x04, 0x7F], &[0x25, 0x01], ACK);
        let steps = feed(&mut framer, &raw);

        assert_eq!(steps[3].admitted, Some(false));
        assert!(frames(&steps).is_empty());
        assert!(errors(&steps).is_empty());
        assert!(framer.is_idle());
    }

    #[test]
    fn test_filtered_frame_still_checks_checksum() {
        let mut framer = Framer::new(UnitFilter::unit(Address(7)));
        let mut raw = encode_frame([0xBD, 0x03, 0x04, 0x7F], &[0x25, 0x01], ACK);
        raw[7] ^= 0x01;
        let errs = errors(&feed(&mut framer, &raw));
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], FrameError::BadChecksum { .. }));
    }

    #[test]
    fn test_force_idle_mid_frame() {
        let mut framer = Framer::default();
        let _ = feed(&mut framer, &[0xBD, 0x01, 0x02]);
        assert_eq!(framer.force_idle(), vec![0xBD, 0x01, 0x02]);
        assert_eq!(framer, Framer::default());

        // Next byte starts a fresh frame at position 1
        let raw = encode_frame(GET_SETPOINT, &[0x25, 0x01], ACK);
        assert_eq!(frames(&feed(&mut framer, &raw)).len(), 1);
    }

    #[test]
    fn test_force_idle_ends_skip() {
        let mut framer = Framer::default();
        let _ = feed(&mut framer, &[0xBD, 0x01, 0x02, 0x7F, 30, 0x00]);
        assert!(matches!(framer.phase(), Phase::Skipping(_)));
        let _ = framer.force_idle();
        assert_eq!(framer, Framer::default());
    }

    proptest! {
        #[test]
        fn any_valid_frame_is_reassembled(
            header in prop::array::uniform4(any::<u8>()),
            data in prop::collection::vec(any::<u8>(), 0..=MAX_DATA_LEN),
            ack in prop_oneof![Just(ACK), Just(NAK)],
        ) {
            let mut framer = Framer::default();
            let raw = encode_frame(header, &data, ack);
            let steps = feed(&mut framer, &raw);
            let got = frames(&steps);
            prop_assert_eq!(got.len(), 1);
            prop_assert_eq!(got[0].raw(), raw.as_slice());
            prop_assert!(errors(&steps).is_empty());
            prop_assert_eq!(framer, Framer::default());
        }

        #[test]
        fn idle_gap_after_garbage_resets_completely(
            garbage in prop::collection::vec(any::<u8>(), 0..100),
            unit in prop::option::of(any::<u8>()),
        ) {
            let filter = UnitFilter::from(unit.map(Address));
            let mut framer = Framer::new(filter);
            let _ = feed(&mut framer, &garbage);
            let _ = framer.force_idle();
            prop_assert_eq!(framer, Framer::new(filter));
        }

        #[test]
        fn buffer_never_exceeds_capacity(garbage in prop::collection::vec(any::<u8>(), 0..200)) {
            let mut framer = Framer::default();
            for b in garbage {
                let _ = framer.ingest(b);
                prop_assert!(framer.buffered().len() <= FRAME_CAPACITY);
            }
        }
    }
}
