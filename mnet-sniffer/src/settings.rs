//! Persistent settings
//!
//! Stored as JSON under `$XDG_CONFIG_HOME/mnet-sniffer/settings.json`
//! (`~/.config/mnet-sniffer` when unset). Command-line flags override what
//! is loaded here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use mnet_monitor::{MonitorConfig, SerialSettings, DEFAULT_BAUD};
use mnet_protocol::{Address, UnitFilter};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "mnet-sniffer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Serial port on the M-NET bus
    pub mnet_port: Option<String>,
    pub mnet_baud: u32,
    /// Serial port of the bridge controller, if it is also monitored
    pub bridge_port: Option<String>,
    pub bridge_baud: u32,
    /// Silence that ends a frame
    pub idle_gap_ms: u64,
    /// Only show frames to or from this unit
    pub filter_unit: Option<u8>,
    /// Traffic log, appended to
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mnet_port: None,
            mnet_baud: DEFAULT_BAUD,
            bridge_port: None,
            bridge_baud: DEFAULT_BAUD,
            idle_gap_ms: 10,
            filter_unit: None,
            log_file: PathBuf::from("log.txt"),
        }
    }
}

impl Settings {
    /// Uses $XDG_CONFIG_HOME/mnet-sniffer, falls back to ~/.config/mnet-sniffer
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join(APP_DIR));
            }
        }
        dirs::home_dir().map(|h| h.join(".config").join(APP_DIR))
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings, falling back to defaults if missing or unreadable
    pub fn load() -> Self {
        Self::settings_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::settings_path().context("could not determine settings path")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create settings directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        Ok(())
    }

    /// Line settings for the monitor
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            idle_gap: Duration::from_millis(self.idle_gap_ms),
            filter: UnitFilter::from(self.filter_unit.map(Address)),
            mnet: SerialSettings::mnet(self.mnet_baud),
            bridge: SerialSettings::bridge(self.bridge_baud),
        }
    }
}
