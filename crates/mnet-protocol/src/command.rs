//! Values carried in M-NET command data
//!
//! Each enumerated value keeps the raw code when it is not one we know, so a
//! new code on the wire renders as an explicit marker instead of failing.

use std::fmt;

/// Marker printed for codes we have not seen before
pub const UNRECOGNIZED: &str = "???";

/// Power on/off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerState {
    Off,
    On,
    Unrecognized(u8),
}

impl From<u8> for PowerState {
    fn from(code: u8) -> Self {
        match code {
            0 => PowerState::Off,
            1 => PowerState::On,
            other => PowerState::Unrecognized(other),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Off => f.write_str("off"),
            PowerState::On => f.write_str("on"),
            PowerState::Unrecognized(code) => write!(f, "{} (0x{:02X})", UNRECOGNIZED, code),
        }
    }
}

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    Heat,
    Cool,
    Auto,
    Unrecognized(u8),
}

impl From<u8> for Mode {
    fn from(code: u8) -> Self {
        match code {
            0x07 => Mode::Heat,
            0x08 => Mode::Cool,
            0x20 => Mode::Auto,
            other => Mode::Unrecognized(other),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Heat => f.write_str("heat"),
            Mode::Cool => f.write_str("cool"),
            Mode::Auto => f.write_str("auto"),
            Mode::Unrecognized(code) => write!(f, "{} (0x{:02X})", UNRECOGNIZED, code),
        }
    }
}

/// Fan speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FanSpeed {
    Low,
    Medium,
    High,
    Auto,
    Unrecognized(u8),
}

impl From<u8> for FanSpeed {
    fn from(code: u8) -> Self {
        match code {
            0x04 => FanSpeed::Low,
            0x05 => FanSpeed::Medium,
            0x06 => FanSpeed::High,
            0x0B => FanSpeed::Auto,
            other => FanSpeed::Unrecognized(other),
        }
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanSpeed::Low => f.write_str("low"),
            FanSpeed::Medium => f.write_str("medium"),
            FanSpeed::High => f.write_str("high"),
            FanSpeed::Auto => f.write_str("auto"),
            FanSpeed::Unrecognized(code) => write!(f, "{} (0x{:02X})", UNRECOGNIZED, code),
        }
    }
}

/// Whether the unit is running, as reported by a status reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunState {
    Stopped,
    Running,
    Unrecognized(u8),
}

impl From<u8> for RunState {
    fn from(code: u8) -> Self {
        match code {
            0 => RunState::Stopped,
            1 => RunState::Running,
            other => RunState::Unrecognized(other),
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Stopped => f.write_str("stopped"),
            RunState::Running => f.write_str("running"),
            RunState::Unrecognized(code) => write!(f, "{} (0x{:02X})", UNRECOGNIZED, code),
        }
    }
}

/// A temperature as encoded in two data bytes
///
/// `b0 * 10 + (b1 >> 4)` is the whole number of degrees Celsius and
/// `b1 & 0x0F` the tenths digit, so `01 95` is 19.5 C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Temperature {
    whole: u16,
    tenth: u8,
}

impl Temperature {
    pub fn from_bytes(b0: u8, b1: u8) -> Self {
        Self {
            whole: b0 as u16 * 10 + (b1 >> 4) as u16,
            tenth: b1 & 0x0F,
        }
    }

    /// Whole degrees Celsius
    pub fn whole(&self) -> u16 {
        self.whole
    }

    /// Tenths digit as sent (a nibble, so it can exceed 9)
    pub fn tenth(&self) -> u8 {
        self.tenth
    }

    pub fn celsius(&self) -> f64 {
        self.whole as f64 + self.tenth as f64 / 10.0
    }

    pub fn fahrenheit(&self) -> f64 {
        self.celsius() * 9.0 / 5.0 + 32.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} deg C, {:.1} deg F",
            self.celsius(),
            self.fahrenheit()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_decode() {
        let t = Temperature::from_bytes(0x01, 0x95);
        assert_eq!(t.whole(), 19);
        assert_eq!(t.tenth(), 5);
        assert!((t.celsius() - 19.5).abs() < 1e-9);
        assert!((t.fahrenheit() - 67.1).abs() < 1e-9);
        assert_eq!(t.to_string(), "19.5 deg C, 67.1 deg F");
    }

    #[test]
    fn test_temperature_zero() {
        let t = Temperature::from_bytes(0x00, 0x00);
        assert_eq!(t.to_string(), "0.0 deg C, 32.0 deg F");
    }

    #[test]
    fn test_fan_speed_codes() {
        assert_eq!(FanSpeed::from(4), FanSpeed::Low);
        assert_eq!(FanSpeed::from(5), FanSpeed::Medium);
        assert_eq!(FanSpeed::from(6), FanSpeed::High);
        assert_eq!(FanSpeed::from(0x0B), FanSpeed::Auto);
        assert_eq!(FanSpeed::from(0x07).to_string(), "??? (0x07)");
    }

    #[test]
    fn test_mode_codes() {
        assert_eq!(Mode::from(7).to_string(), "heat");
        assert_eq!(Mode::from(8).to_string(), "cool");
        assert_eq!(Mode::from(32).to_string(), "auto");
        assert_eq!(Mode::from(1), Mode::Unrecognized(1));
    }

    #[test]
    fn test_power_and_run_state() {
        assert_eq!(PowerState::from(1).to_string(), "on");
        assert_eq!(PowerState::from(0).to_string(), "off");
        assert_eq!(PowerState::from(9).to_string(), "??? (0x09)");
        assert_eq!(RunState::from(0).to_string(), "stopped");
        assert_eq!(RunState::from(1).to_string(), "running");
    }
}
