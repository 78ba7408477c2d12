//! M-NET Sniffer
//!
//! Passively decodes traffic on an M-NET HVAC controller bus, optionally
//! alongside the ASCII protocol of a bridge controller on a second port.
//! Decoded traffic goes to stdout and is appended to a log file; diagnostics
//! go to stderr.

mod settings;

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mnet_monitor::replay::{capture_reader, load_capture};
use mnet_monitor::{
    list_ports, BridgeLineReader, LineHandle, LineId, MnetLineReader, MonitorError, MonitorEvent,
    Tee, TrafficSink,
};
use mnet_protocol::Address;
use settings::Settings;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MNET_LINE: LineId = LineId(1);
const BRIDGE_LINE: LineId = LineId(2);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial port on the M-NET bus
    #[arg(long, value_name = "PORT")]
    mnet: Option<String>,

    /// Serial port of the bridge controller
    #[arg(long, value_name = "PORT")]
    bridge: Option<String>,

    /// Only show frames to or from this unit (decimal or 0x hex)
    #[arg(short = 'U', long, value_name = "N")]
    unit: Option<Address>,

    /// Silence in milliseconds that ends a frame
    #[arg(long, value_name = "MS")]
    gap_ms: Option<u64>,

    /// Traffic log file, appended to
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,

    /// Decode a hex capture instead of the M-NET port
    #[arg(long, value_name = "FILE", conflicts_with = "mnet")]
    replay: Option<PathBuf>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Save the effective settings as the new defaults
    #[arg(long)]
    save: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Override loaded settings with whatever was given on the command line
    fn apply(&self, settings: &mut Settings) {
        if let Some(port) = &self.mnet {
            settings.mnet_port = Some(port.clone());
        }
        if let Some(port) = &self.bridge {
            settings.bridge_port = Some(port.clone());
        }
        if let Some(unit) = self.unit {
            settings.filter_unit = Some(unit.0);
        }
        if let Some(gap) = self.gap_ms {
            settings.idle_gap_ms = gap;
        }
        if let Some(log) = &self.log {
            settings.log_file = log.clone();
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "mnet_sniffer=debug,mnet_protocol=debug,mnet_monitor=debug"
    } else {
        "mnet_sniffer=info,mnet_protocol=info,mnet_monitor=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.list_ports {
        for port in list_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    let mut settings = Settings::load();
    args.apply(&mut settings);
    if args.save {
        let path = settings.save()?;
        info!("Saved settings to {}", path.display());
    }

    info!("Starting M-NET sniffer {}", env!("CARGO_PKG_VERSION"));
    run(&settings, args.replay.as_deref()).await
}

/// Start the configured lines and write traffic until Ctrl-C or end of input
async fn run(settings: &Settings, replay: Option<&std::path::Path>) -> Result<()> {
    if settings.mnet_port.is_none() && settings.bridge_port.is_none() && replay.is_none() {
        return Err(MonitorError::NoLines.into());
    }

    let config = settings.monitor_config();
    if let Some(unit) = config.filter.configured() {
        info!("Filtering for unit {}", unit);
    }

    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)
        .with_context(|| format!("failed to open log file {}", settings.log_file.display()))?;

    let (event_tx, mut event_rx) = mpsc::channel::<MonitorEvent>(1024);
    let mut handles: Vec<LineHandle> = Vec::new();

    if let Some(path) = replay {
        let bytes = load_capture(path)?;
        let reader = MnetLineReader::new(
            MNET_LINE,
            path.display().to_string(),
            capture_reader(bytes),
            config.filter,
            config.idle_gap,
            event_tx.clone(),
        );
        handles.push(reader.spawn());
    } else if let Some(port) = &settings.mnet_port {
        match MnetLineReader::open(
            MNET_LINE,
            port,
            config.mnet,
            config.filter,
            config.idle_gap,
            event_tx.clone(),
        ) {
            Ok(reader) => handles.push(reader.spawn()),
            Err(e) => warn!("Failed to open M-NET port {}: {}", port, e),
        }
    }

    let mut beside_bridge = false;
    if let Some(port) = &settings.bridge_port {
        match BridgeLineReader::open(BRIDGE_LINE, port, config.bridge, event_tx.clone()) {
            Ok(reader) => {
                handles.push(reader.spawn());
                beside_bridge = true;
            }
            Err(e) => warn!("Failed to open bridge port {}: {}", port, e),
        }
    }
    drop(event_tx);

    if handles.is_empty() {
        return Err(MonitorError::NoLines.into());
    }

    let mut sink = TrafficSink::new(Tee::new(io::stdout(), log), beside_bridge);
    let mut open_lines = handles.len();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }

            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let line = event.line();
                match &event {
                    MonitorEvent::LineOpened { kind, name, .. } => {
                        info!("Monitoring {} on {} ({})", kind.name(), name, line);
                    }
                    MonitorEvent::Error { message, .. } => error!("{}: {}", line, message),
                    MonitorEvent::LineClosed { .. } => {
                        debug!("{} closed", line);
                        open_lines = open_lines.saturating_sub(1);
                    }
                    MonitorEvent::Mnet { .. } | MonitorEvent::BridgeText { .. } => {}
                }
                sink.handle(&event).context("failed to write traffic")?;
                if open_lines == 0 {
                    break;
                }
            }
        }
    }

    // Readers blocked on a full channel see it close and stop
    drop(event_rx);
    for handle in handles {
        handle.shutdown().await;
    }
    info!("Stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unit_flag_parses_decimal_and_hex() {
        let args = Args::try_parse_from(["mnet-sniffer", "--mnet", "COM3", "-U", "5"]).unwrap();
        assert_eq!(args.unit, Some(Address(5)));

        let args = Args::try_parse_from(["mnet-sniffer", "--unit", "0x1F"]).unwrap();
        assert_eq!(args.unit, Some(Address(0x1F)));

        assert!(Args::try_parse_from(["mnet-sniffer", "-U", "256"]).is_err());
    }

    #[test]
    fn test_replay_conflicts_with_mnet() {
        let result =
            Args::try_parse_from(["mnet-sniffer", "--mnet", "COM3", "--replay", "serial.dat"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let args = Args::try_parse_from([
            "mnet-sniffer",
            "--mnet",
            "/dev/ttyUSB0",
            "--gap-ms",
            "40",
            "--log",
            "bus.txt",
        ])
        .unwrap();

        let mut settings = Settings {
            mnet_port: Some("COM1".into()),
            bridge_port: Some("COM2".into()),
            filter_unit: Some(9),
            ..Default::default()
        };
        args.apply(&mut settings);

        assert_eq!(settings.mnet_port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(settings.bridge_port.as_deref(), Some("COM2"));
        assert_eq!(settings.filter_unit, Some(9));
        assert_eq!(settings.idle_gap_ms, 40);
        assert_eq!(settings.log_file, PathBuf::from("bus.txt"));
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("mnet-sniffer-main-{}", std::process::id()))
            .join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_run_without_lines_fails() {
        let err = run(&Settings::default(), None).await.unwrap_err();
        assert!(err.downcast_ref::<MonitorError>().is_some());
    }

    #[tokio::test]
    async fn test_unopenable_bridge_port_does_not_stop_replay() {
        let dir = temp_dir("bad_bridge");
        let capture = dir.join("serial.dat");
        std::fs::write(&capture, "BD 01 02 7F 02 25 01 99 06\n").unwrap();

        let settings = Settings {
            bridge_port: Some("/dev/no-such-bridge-port".into()),
            log_file: dir.join("log.txt"),
            ..Default::default()
        };
        run(&settings, Some(capture.as_path())).await.unwrap();

        let log = std::fs::read_to_string(dir.join("log.txt")).unwrap();
        assert!(log.contains("01->02 get setpoint temp"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_no_openable_port_fails() {
        let dir = temp_dir("no_ports");
        let settings = Settings {
            mnet_port: Some("/dev/no-such-mnet-port".into()),
            bridge_port: Some("/dev/no-such-bridge-port".into()),
            log_file: dir.join("log.txt"),
            ..Default::default()
        };
        let err = run(&settings, None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MonitorError>(),
            Some(MonitorError::NoLines)
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    proptest! {
        #[test]
        fn unit_flag_accepts_every_address(unit: u8) {
            let decimal = unit.to_string();
            let hex = format!("0x{:02x}", unit);
            let a = Args::try_parse_from(["mnet-sniffer", "-U", decimal.as_str()]).unwrap();
            let b = Args::try_parse_from(["mnet-sniffer", "-U", hex.as_str()]).unwrap();
            prop_assert_eq!(a.unit, Some(Address(unit)));
            prop_assert_eq!(b.unit, Some(Address(unit)));
        }
    }
}
