//! M-NET Line Monitor
//!
//! Connects the synchronous decoder in `mnet_protocol` to real lines.
//!
//! # Architecture
//!
//! Each monitored line runs in its own task:
//!
//! - [`MnetLineReader`] reads the M-NET bus with a short read timeout; bytes
//!   and timeouts become decoder input, and decoder output is forwarded
//! - [`BridgeLineReader`] collects the bridge controller's ASCII traffic into
//!   lines
//!
//! Both report through one [`MonitorEvent`] channel, consumed by a
//! [`TrafficSink`] that writes text to the console and the capture log.
//! A capture file can stand in for the M-NET port (see [`replay`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use mnet_monitor::{LineId, MnetLineReader, MonitorConfig, MonitorEvent};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), mnet_monitor::MonitorError> {
//! let config = MonitorConfig::default();
//! let (event_tx, mut event_rx) = mpsc::channel::<MonitorEvent>(256);
//!
//! let reader = MnetLineReader::open(
//!     LineId(1),
//!     "/dev/ttyUSB0",
//!     config.mnet,
//!     config.filter,
//!     config.idle_gap,
//!     event_tx,
//! )?;
//! let handle = reader.spawn();
//!
//! while let Some(event) = event_rx.recv().await {
//!     println!("{:?}", event);
//! }
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod line;
pub mod ports;
pub mod reader;
pub mod replay;
pub mod sink;

pub use bridge::BridgeLineAssembler;
pub use config::{MonitorConfig, DEFAULT_BAUD, DEFAULT_IDLE_GAP};
pub use error::MonitorError;
pub use events::{LineId, LineKind, MonitorEvent};
pub use line::SerialSettings;
pub use ports::{list_ports, PortInfo};
pub use reader::{BridgeLineReader, LineHandle, LineTaskCommand, MnetLineReader};
pub use sink::{Tee, TrafficSink};
