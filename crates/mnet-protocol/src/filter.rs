//! Unit filter
//!
//! Restricts decoded output to frames sent to or from a single unit. The
//! filter only hides frames: checksum validation and handshake tracking still
//! run for every frame on the wire.

use crate::frame::Address;

/// Optional single-unit address filter, fixed for the life of a framer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitFilter {
    unit: Option<Address>,
}

impl UnitFilter {
    /// A filter that admits every frame
    pub fn disabled() -> Self {
        Self { unit: None }
    }

    /// Admit only frames to or from `unit`
    pub fn unit(unit: Address) -> Self {
        Self { unit: Some(unit) }
    }

    pub fn configured(&self) -> Option<Address> {
        self.unit
    }

    pub fn passes(&self, source: Address, destination: Address) -> bool {
        passes(source, destination, self.unit)
    }
}

impl From<Option<Address>> for UnitFilter {
    fn from(unit: Option<Address>) -> Self {
        Self { unit }
    }
}

/// True if no unit is configured, or the unit is either endpoint
pub fn passes(source: Address, destination: Address, configured_unit: Option<Address>) -> bool {
    match configured_unit {
        None => true,
        Some(unit) => unit == source || unit == destination,
    }
}
