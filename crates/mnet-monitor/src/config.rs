//! Monitor configuration
//!
//! Fixed once the line tasks start; the unit filter in particular never
//! changes for the life of the process.

use std::time::Duration;

use mnet_protocol::UnitFilter;

use crate::line::SerialSettings;

/// Default silence that ends a frame
pub const DEFAULT_IDLE_GAP: Duration = Duration::from_millis(10);

/// Default baud rate on both lines
pub const DEFAULT_BAUD: u32 = 9600;

/// Settings shared by the line tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Read timeout after which the M-NET line counts as idle
    pub idle_gap: Duration,
    pub filter: UnitFilter,
    pub mnet: SerialSettings,
    pub bridge: SerialSettings,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self {
            idle_gap: DEFAULT_IDLE_GAP,
            filter: UnitFilter::disabled(),
            mnet: SerialSettings::mnet(DEFAULT_BAUD),
            bridge: SerialSettings::bridge(DEFAULT_BAUD),
        }
    }

    pub fn with_filter(mut self, filter: UnitFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_idle_gap(mut self, idle_gap: Duration) -> Self {
        self.idle_gap = idle_gap;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnet_protocol::Address;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.idle_gap, Duration::from_millis(10));
        assert_eq!(config.filter, UnitFilter::disabled());
        assert_eq!(config.mnet.baud, 9600);
        assert_eq!(config.bridge.baud, 9600);
    }

    #[test]
    fn test_builders() {
        let config = MonitorConfig::new()
            .with_filter(UnitFilter::unit(Address(7)))
            .with_idle_gap(Duration::from_millis(25));
        assert_eq!(config.filter.configured(), Some(Address(7)));
        assert_eq!(config.idle_gap, Duration::from_millis(25));
    }
}
