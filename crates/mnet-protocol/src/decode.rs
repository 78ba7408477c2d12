//! Per-command decoders
//!
//! Turns a classified frame into a structured description. Offsets below are
//! into the data field (the byte after the data-length byte is offset 0).

use std::fmt;

use crate::command::{FanSpeed, Mode, PowerState, RunState, Temperature, UNRECOGNIZED};
use crate::dispatch::{dispatch, Variant};
use crate::frame::{Address, Frame};

/// Offset of the parameter byte in set commands and simple replies
const PARAM_OFFSET: usize = 2;
/// Offset of the temperature in setpoint frames
const SETPOINT_TEMP_OFFSET: usize = 2;
/// Offset of the temperature in the current-temperature reply
const CURRENT_TEMP_OFFSET: usize = 3;

/// Structured meaning of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decoded {
    Power { state: PowerState },
    SetMode { mode: Mode },
    SetSetpoint { temp: Temperature },
    SetFanSpeed { speed: FanSpeed },
    GetStatus,
    Status { state: RunState },
    GetMode,
    ModeReport { mode: Mode },
    GetSetpoint,
    SetpointReport { temp: Temperature },
    GetFanSpeed,
    FanSpeedReport { speed: FanSpeed },
    GetCurrentTemp,
    CurrentTempReport { temp: Temperature },
    /// Acknowledgement of a set command
    Ok,
    Unknown,
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::Power { state } => write!(f, "turn {}", state),
            Decoded::SetMode { mode } => write!(f, "set mode {}", mode),
            Decoded::SetSetpoint { temp } => write!(f, "set temp {}", temp),
            Decoded::SetFanSpeed { speed } => write!(f, "set fan speed {}", speed),
            Decoded::GetStatus => f.write_str("get status"),
            Decoded::Status { state } => write!(f, "{}", state),
            Decoded::GetMode => f.write_str("get mode"),
            Decoded::ModeReport { mode } => write!(f, "{}", mode),
            Decoded::GetSetpoint => f.write_str("get setpoint temp"),
            Decoded::SetpointReport { temp } => write!(f, "{}", temp),
            Decoded::GetFanSpeed => f.write_str("get fan speed"),
            Decoded::FanSpeedReport { speed } => write!(f, "{}", speed),
            Decoded::GetCurrentTemp => f.write_str("get current temp"),
            Decoded::CurrentTempReport { temp } => write!(f, "{}", temp),
            Decoded::Ok => f.write_str("ok"),
            Decoded::Unknown => f.write_str(UNRECOGNIZED),
        }
    }
}

fn temperature_at(frame: &Frame, offset: usize) -> Temperature {
    Temperature::from_bytes(frame.data_byte(offset), frame.data_byte(offset + 1))
}

/// Decode a frame already classified as `variant`
pub fn decode(variant: Variant, frame: &Frame) -> Decoded {
    let param = frame.data_byte(PARAM_OFFSET);
    match variant {
        Variant::PowerSet => Decoded::Power {
            state: PowerState::from(param),
        },
        Variant::ModeSet => Decoded::SetMode {
            mode: Mode::from(param),
        },
        Variant::SetpointSet => Decoded::SetSetpoint {
            temp: temperature_at(frame, SETPOINT_TEMP_OFFSET),
        },
        Variant::FanSpeedSet => Decoded::SetFanSpeed {
            speed: FanSpeed::from(param),
        },
        Variant::StatusGet => Decoded::GetStatus,
        Variant::StatusGetAck => Decoded::Status {
            state: RunState::from(param),
        },
        Variant::ModeGet => Decoded::GetMode,
        Variant::ModeGetAck => Decoded::ModeReport {
            mode: Mode::from(param),
        },
        Variant::SetpointGet => Decoded::GetSetpoint,
        Variant::SetpointGetAck => Decoded::SetpointReport {
            temp: temperature_at(frame, SETPOINT_TEMP_OFFSET),
        },
        Variant::FanSpeedGet => Decoded::GetFanSpeed,
        Variant::FanSpeedGetAck => Decoded::FanSpeedReport {
            speed: FanSpeed::from(param),
        },
        Variant::CurrentTempGet => Decoded::GetCurrentTemp,
        Variant::CurrentTempGetAck => Decoded::CurrentTempReport {
            temp: temperature_at(frame, CURRENT_TEMP_OFFSET),
        },
        Variant::PowerAck
        | Variant::ModeSetAck
        | Variant::SetpointSetAck
        | Variant::FanSpeedSetAck => Decoded::Ok,
        Variant::Unknown => Decoded::Unknown,
    }
}

/// A validated frame with its classification and decoded meaning
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedFrame {
    pub frame: Frame,
    pub variant: Variant,
    pub decoded: Decoded,
}

impl DecodedFrame {
    /// Classify and decode a frame
    pub fn new(frame: Frame) -> Self {
        let variant = dispatch(&frame);
        let decoded = decode(variant, &frame);
        Self {
            frame,
            variant,
            decoded,
        }
    }

    pub fn source(&self) -> Address {
        self.frame.source()
    }

    pub fn destination(&self) -> Address {
        self.frame.destination()
    }

    pub fn raw(&self) -> &[u8] {
        self.frame.raw()
    }

    /// Always true for frames produced by the framer
    pub fn checksum_valid(&self) -> bool {
        self.frame.checksum_valid()
    }

    pub fn variant_name(&self) -> &'static str {
        self.variant.name()
    }

    pub fn description(&self) -> String {
        self.decoded.to_string()
    }
}
