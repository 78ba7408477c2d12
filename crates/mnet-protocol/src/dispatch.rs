//! Format dispatch
//!
//! Frames are classified by an ordered table of masked byte patterns applied
//! to a six-byte window starting at the data-length byte. The first rule whose
//! every `(window[i] & mask[i]) == value[i]` holds wins; if none do the frame
//! is [`Variant::Unknown`].

use crate::frame::{Frame, DATA_OFFSET, LENGTH_OFFSET};

/// Bytes compared per rule, starting at the data-length byte
pub const WINDOW_LEN: usize = 6;

/// Mask value meaning "must equal"
pub const MATCH: u8 = 0xFF;

/// Recognized command and reply shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    PowerSet,
    PowerAck,
    ModeSet,
    ModeSetAck,
    SetpointSet,
    SetpointSetAck,
    FanSpeedSet,
    FanSpeedSetAck,
    StatusGet,
    StatusGetAck,
    ModeGet,
    ModeGetAck,
    SetpointGet,
    SetpointGetAck,
    FanSpeedGet,
    FanSpeedGetAck,
    CurrentTempGet,
    CurrentTempGetAck,
    Unknown,
}

impl Variant {
    /// Human-readable name of the command shape
    pub fn name(&self) -> &'static str {
        match self {
            Variant::PowerSet => "turn on/off",
            Variant::PowerAck => "turn on/off ack",
            Variant::ModeSet => "set mode",
            Variant::ModeSetAck => "set mode ack",
            Variant::SetpointSet => "set temp",
            Variant::SetpointSetAck => "set temp ack",
            Variant::FanSpeedSet => "set fan speed",
            Variant::FanSpeedSetAck => "set fan speed ack",
            Variant::StatusGet => "get status",
            Variant::StatusGetAck => "get status ack",
            Variant::ModeGet => "get mode",
            Variant::ModeGetAck => "get mode ack",
            Variant::SetpointGet => "get setpoint temp",
            Variant::SetpointGetAck => "get setpoint temp ack",
            Variant::FanSpeedGet => "get fan speed",
            Variant::FanSpeedGetAck => "get fan speed ack",
            Variant::CurrentTempGet => "get current temp",
            Variant::CurrentTempGetAck => "get current temp ack",
            Variant::Unknown => "Unknown",
        }
    }
}

/// One entry of the format table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRule {
    pub mask: [u8; WINDOW_LEN],
    pub value: [u8; WINDOW_LEN],
    pub variant: Variant,
}

impl FormatRule {
    /// Rule requiring the leading window bytes to equal `bytes` exactly;
    /// the remaining positions are don't-care
    pub const fn exact(bytes: &[u8], variant: Variant) -> Self {
        let mut mask = [0u8; WINDOW_LEN];
        let mut value = [0u8; WINDOW_LEN];
        let mut i = 0;
        while i < bytes.len() && i < WINDOW_LEN {
            mask[i] = MATCH;
            value[i] = bytes[i];
            i += 1;
        }
        Self {
            mask,
            value,
            variant,
        }
    }

    pub const fn masked(mask: [u8; WINDOW_LEN], value: [u8; WINDOW_LEN], variant: Variant) -> Self {
        Self {
            mask,
            value,
            variant,
        }
    }

    pub fn matches(&self, window: &Window) -> bool {
        window
            .0
            .iter()
            .zip(self.mask.iter().zip(self.value.iter()))
            .all(|(&byte, (&mask, &value))| byte & mask == value)
    }
}

/// Known M-NET command shapes, in match order
pub const FORMAT_TABLE: &[FormatRule] = &[
    FormatRule::exact(&[5, 0x0D, 0x01], Variant::PowerSet),
    FormatRule::exact(&[3, 0x0D, 0x81, 0x00], Variant::PowerAck),
    FormatRule::exact(&[3, 0x0D, 0x02], Variant::ModeSet),
    FormatRule::exact(&[3, 0x0D, 0x82, 0x00], Variant::ModeSetAck),
    FormatRule::exact(&[5, 0x05, 0x01], Variant::SetpointSet),
    FormatRule::exact(&[3, 0x05, 0x81, 0x00], Variant::SetpointSetAck),
    FormatRule::exact(&[3, 0x0D, 0x0E], Variant::FanSpeedSet),
    FormatRule::exact(&[3, 0x0D, 0x8E, 0x00], Variant::FanSpeedSetAck),
    FormatRule::exact(&[2, 0x2D, 0x01], Variant::StatusGet),
    FormatRule::exact(&[5, 0x2D, 0x81], Variant::StatusGetAck),
    FormatRule::exact(&[2, 0x2D, 0x02], Variant::ModeGet),
    FormatRule::exact(&[3, 0x2D, 0x82], Variant::ModeGetAck),
    FormatRule::exact(&[2, 0x25, 0x01], Variant::SetpointGet),
    FormatRule::exact(&[5, 0x25, 0x81], Variant::SetpointGetAck),
    FormatRule::exact(&[2, 0x2D, 0x0E], Variant::FanSpeedGet),
    FormatRule::exact(&[3, 0x2D, 0x8E], Variant::FanSpeedGetAck),
    FormatRule::exact(&[3, 0x35, 0x03, 0x22], Variant::CurrentTempGet),
    FormatRule::exact(&[5, 0x35, 0x83, 0x22], Variant::CurrentTempGetAck),
];

/// The bytes a rule is compared against
///
/// Holds the data-length byte and up to five data bytes; positions past the
/// end of the data are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window(pub [u8; WINDOW_LEN]);

impl Window {
    pub fn of(frame: &Frame) -> Self {
        Self::from_raw(frame.raw())
    }

    /// Window over raw frame bytes (role byte first)
    pub fn from_raw(raw: &[u8]) -> Self {
        let mut window = [0u8; WINDOW_LEN];
        let Some(&data_len) = raw.get(LENGTH_OFFSET) else {
            return Self(window);
        };
        window[0] = data_len;

        let data_end = (DATA_OFFSET + data_len as usize).min(raw.len());
        let data = raw.get(DATA_OFFSET..data_end).unwrap_or(&[]);
        for (slot, &byte) in window[1..].iter_mut().zip(data) {
            *slot = byte;
        }
        Self(window)
    }
}

/// First matching variant in `table`, or `Unknown`
pub fn match_table(table: &[FormatRule], window: &Window) -> Variant {
    table
        .iter()
        .find(|rule| rule.matches(window))
        .map(|rule| rule.variant)
        .unwrap_or(Variant::Unknown)
}

/// Classify a frame against [`FORMAT_TABLE`]
pub fn dispatch(frame: &Frame) -> Variant {
    match_table(FORMAT_TABLE, &Window::of(frame))
}
