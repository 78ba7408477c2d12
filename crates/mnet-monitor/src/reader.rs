//! Async line readers
//!
//! Each monitored line runs in its own spawned task and reports through the
//! shared [`MonitorEvent`] channel. Readers are generic over the I/O type, so
//! a serial port, a replay capture or an in-memory `DuplexStream` all take
//! the same path.
//!
//! The M-NET reader turns each read timeout into a "no data" cycle for the
//! decoder, which is how an idle line ends a partial frame.
//!
//! A zero-byte read ends a replay or in-memory stream. A serial port can
//! return zero bytes without being gone, so readers opened on a port treat
//! it as a quiet cycle instead.

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use mnet_protocol::{DecoderEvent, LineDecoder, LineInput, UnitFilter};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::SerialStream;
use tracing::{debug, info, trace, warn};

use crate::bridge::BridgeLineAssembler;
use crate::error::MonitorError;
use crate::events::{LineId, LineKind, MonitorEvent};
use crate::line::{self, SerialSettings};

const READ_BUFFER_LEN: usize = 256;

/// How often the bridge reader wakes without traffic
const BRIDGE_POLL: Duration = Duration::from_millis(100);

/// Commands that can be sent to a running line task
#[derive(Debug)]
pub enum LineTaskCommand {
    /// Stop reading; any partial frame is dropped
    Shutdown,
}

/// A spawned line task
pub struct LineHandle {
    pub line: LineId,
    cmd_tx: mpsc::Sender<LineTaskCommand>,
    task: JoinHandle<()>,
}

impl LineHandle {
    fn spawn<F>(line: LineId, run: impl FnOnce(mpsc::Receiver<LineTaskCommand>) -> F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let task = tokio::spawn(run(cmd_rx));
        Self { line, cmd_tx, task }
    }

    /// Ask the task to stop and wait for it
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(LineTaskCommand::Shutdown).await;
        let _ = self.task.await;
    }

    /// Wait for the task to stop on its own (end of input)
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Reads an M-NET line and feeds the decoder
pub struct MnetLineReader<T> {
    line: LineId,
    name: String,
    io: T,
    decoder: LineDecoder,
    idle_gap: Duration,
    close_on_eof: bool,
    event_tx: mpsc::Sender<MonitorEvent>,
    buffer: Vec<u8>,
}

impl MnetLineReader<SerialStream> {
    /// Open an M-NET serial port
    pub fn open(
        line: LineId,
        port_name: &str,
        settings: SerialSettings,
        filter: UnitFilter,
        idle_gap: Duration,
        event_tx: mpsc::Sender<MonitorEvent>,
    ) -> Result<Self, MonitorError> {
        let stream = line::open(port_name, settings)?;
        Ok(Self::new(
            line,
            port_name.to_string(),
            stream,
            filter,
            idle_gap,
            event_tx,
        )
        .close_on_eof(false))
    }
}

impl<T> MnetLineReader<T>
where
    T: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(
        line: LineId,
        name: String,
        io: T,
        filter: UnitFilter,
        idle_gap: Duration,
        event_tx: mpsc::Sender<MonitorEvent>,
    ) -> Self {
        Self {
            line,
            name,
            io,
            decoder: LineDecoder::new(filter),
            idle_gap,
            close_on_eof: true,
            event_tx,
            buffer: vec![0u8; READ_BUFFER_LEN],
        }
    }

    /// Whether a zero-byte read ends the line (the default) or counts as a
    /// quiet cycle
    pub fn close_on_eof(mut self, close: bool) -> Self {
        self.close_on_eof = close;
        self
    }

    /// Run the read loop in its own task
    pub fn spawn(self) -> LineHandle {
        let line = self.line;
        LineHandle::spawn(line, move |cmd_rx| self.run(cmd_rx))
    }

    /// Feed one poll cycle; false once nobody is listening
    async fn forward(&mut self, input: LineInput, now: Instant) -> bool {
        for event in self.decoder.push(input, now) {
            match &event {
                DecoderEvent::Frame { frame, .. } => trace!(
                    role = frame.frame.role().name(),
                    variant = frame.variant_name(),
                    "frame on {}",
                    self.name
                ),
                DecoderEvent::Fault(err) => debug!(
                    kind = err.kind(),
                    bytes = err.raw().len(),
                    "framing fault on {}",
                    self.name
                ),
                DecoderEvent::IdleGap { .. } => {}
            }
            let event = MonitorEvent::Mnet {
                line: self.line,
                event,
            };
            if self.event_tx.send(event).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Main read loop - runs until end of input, a read error, shutdown, or
    /// the event channel closes
    pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<LineTaskCommand>) {
        info!("Starting M-NET read loop on {}", self.name);
        let _ = self
            .event_tx
            .send(MonitorEvent::LineOpened {
                line: self.line,
                kind: LineKind::Mnet,
                name: self.name.clone(),
            })
            .await;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(LineTaskCommand::Shutdown) | None => {
                            info!("Shutdown requested for {}", self.name);
                            break;
                        }
                    }
                }

                result = tokio::time::timeout(self.idle_gap, self.io.read(&mut self.buffer)) => {
                    let now = Instant::now();
                    match result {
                        Ok(Ok(0)) if self.close_on_eof => {
                            debug!("End of input on {}", self.name);
                            self.forward(LineInput::NoData, now).await;
                            break;
                        }
                        Ok(Ok(0)) => {
                            if !self.forward(LineInput::NoData, now).await {
                                break;
                            }
                            tokio::time::sleep(self.idle_gap).await;
                        }
                        Ok(Ok(n)) => {
                            let data = self.buffer[..n].to_vec();
                            let mut open = true;
                            for byte in data {
                                if !self.forward(LineInput::Byte(byte), now).await {
                                    open = false;
                                    break;
                                }
                            }
                            if !open {
                                debug!("Event channel closed, stopping {}", self.name);
                                break;
                            }
                        }
                        Ok(Err(e)) => {
                            if e.kind() == ErrorKind::WouldBlock {
                                continue;
                            }
                            warn!("Read error on {}: {}", self.name, e);
                            let _ = self.event_tx.send(MonitorEvent::Error {
                                line: self.line,
                                message: format!("Read error: {}", e),
                            }).await;
                            break;
                        }
                        Err(_) => {
                            if !self.forward(LineInput::NoData, now).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!("M-NET read loop ended on {}", self.name);
        let _ = self
            .event_tx
            .send(MonitorEvent::LineClosed { line: self.line })
            .await;
    }
}

/// Reads the bridge controller's text line
pub struct BridgeLineReader<T> {
    line: LineId,
    name: String,
    io: T,
    assembler: BridgeLineAssembler,
    close_on_eof: bool,
    event_tx: mpsc::Sender<MonitorEvent>,
    buffer: Vec<u8>,
}

impl BridgeLineReader<SerialStream> {
    /// Open the bridge serial port
    pub fn open(
        line: LineId,
        port_name: &str,
        settings: SerialSettings,
        event_tx: mpsc::Sender<MonitorEvent>,
    ) -> Result<Self, MonitorError> {
        let stream = line::open(port_name, settings)?;
        Ok(Self::new(line, port_name.to_string(), stream, event_tx).close_on_eof(false))
    }
}

impl<T> BridgeLineReader<T>
where
    T: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(
        line: LineId,
        name: String,
        io: T,
        event_tx: mpsc::Sender<MonitorEvent>,
    ) -> Self {
        Self {
            line,
            name,
            io,
            assembler: BridgeLineAssembler::new(),
            close_on_eof: true,
            event_tx,
            buffer: vec![0u8; READ_BUFFER_LEN],
        }
    }

    pub fn close_on_eof(mut self, close: bool) -> Self {
        self.close_on_eof = close;
        self
    }

    pub fn spawn(self) -> LineHandle {
        let line = self.line;
        LineHandle::spawn(line, move |cmd_rx| self.run(cmd_rx))
    }

    pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<LineTaskCommand>) {
        info!("Starting bridge read loop on {}", self.name);
        let _ = self
            .event_tx
            .send(MonitorEvent::LineOpened {
                line: self.line,
                kind: LineKind::Bridge,
                name: self.name.clone(),
            })
            .await;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(LineTaskCommand::Shutdown) | None => {
                            info!("Shutdown requested for {}", self.name);
                            break;
                        }
                    }
                }

                result = tokio::time::timeout(BRIDGE_POLL, self.io.read(&mut self.buffer)) => {
                    match result {
                        Ok(Ok(0)) if self.close_on_eof => {
                            debug!("End of input on {}", self.name);
                            break;
                        }
                        Ok(Ok(0)) => tokio::time::sleep(BRIDGE_POLL).await,
                        Ok(Ok(n)) => {
                            let lines = self.assembler.push_bytes(&self.buffer[..n]);
                            let mut open = true;
                            for text in lines {
                                let event = MonitorEvent::BridgeText { line: self.line, text };
                                if self.event_tx.send(event).await.is_err() {
                                    open = false;
                                    break;
                                }
                            }
                            if !open {
                                break;
                            }
                        }
                        Ok(Err(e)) => {
                            if e.kind() == ErrorKind::WouldBlock {
                                continue;
                            }
                            warn!("Read error on {}: {}", self.name, e);
                            let _ = self.event_tx.send(MonitorEvent::Error {
                                line: self.line,
                                message: format!("Read error: {}", e),
                            }).await;
                            break;
                        }
                        Err(_) => {} // Timeout, continue
                    }
                }
            }
        }

        info!("Bridge read loop ended on {}", self.name);
        let _ = self
            .event_tx
            .send(MonitorEvent::LineClosed { line: self.line })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnet_protocol::{encode_frame, DecoderEvent, Variant, ACK};
    use tokio::io::AsyncWriteExt;

    const WAIT: Duration = Duration::from_secs(2);

    async fn next(rx: &mut mpsc::Receiver<MonitorEvent>) -> MonitorEvent {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_mnet_reader_decodes_frame() {
        let (mut tx_side, rx_side) = tokio::io::duplex(64);
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let reader = MnetLineReader::new(
            LineId(1),
            "duplex".into(),
            rx_side,
            UnitFilter::disabled(),
            Duration::from_millis(10),
            event_tx,
        );
        let handle = reader.spawn();

        assert!(matches!(
            next(&mut event_rx).await,
            MonitorEvent::LineOpened { kind: LineKind::Mnet, .. }
        ));

        let raw = encode_frame([0xBD, 0x01, 0x02, 0x7F], &[0x25, 0x01], ACK);
        tx_side.write_all(&raw).await.unwrap();

        match next(&mut event_rx).await {
            MonitorEvent::Mnet {
                line,
                event: DecoderEvent::Frame { frame, .. },
            } => {
                assert_eq!(line, LineId(1));
                assert_eq!(frame.variant, Variant::SetpointGet);
            }
            other => panic!("expected frame, got {:?}", other),
        }

        // The quiet line after the frame is one clean gap
        match next(&mut event_rx).await {
            MonitorEvent::Mnet {
                event: DecoderEvent::IdleGap { discarded, .. },
                ..
            } => assert!(discarded.is_empty()),
            other => panic!("expected idle gap, got {:?}", other),
        }

        handle.shutdown().await;
        assert_eq!(
            next(&mut event_rx).await,
            MonitorEvent::LineClosed { line: LineId(1) }
        );
    }

    #[tokio::test]
    async fn test_mnet_reader_idle_gap_drops_partial_frame() {
        let (mut tx_side, rx_side) = tokio::io::duplex(64);
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let handle = MnetLineReader::new(
            LineId(1),
            "duplex".into(),
            rx_side,
            UnitFilter::disabled(),
            Duration::from_millis(10),
            event_tx,
        )
        .spawn();
        let _ = next(&mut event_rx).await;

        tx_side.write_all(&[0xBD, 0x01, 0x02]).await.unwrap();
        match next(&mut event_rx).await {
            MonitorEvent::Mnet {
                event: DecoderEvent::IdleGap { discarded, .. },
                ..
            } => assert_eq!(discarded, vec![0xBD, 0x01, 0x02]),
            other => panic!("expected idle gap, got {:?}", other),
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_mnet_reader_end_of_input() {
        let raw = encode_frame([0xBD, 0x01, 0x02, 0x7F], &[0x25, 0x01], ACK);
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let handle = MnetLineReader::new(
            LineId(3),
            "capture".into(),
            std::io::Cursor::new(raw),
            UnitFilter::disabled(),
            Duration::from_millis(10),
            event_tx,
        )
        .spawn();

        let mut events = Vec::new();
        loop {
            let event = next(&mut event_rx).await;
            let closed = matches!(event, MonitorEvent::LineClosed { .. });
            events.push(event);
            if closed {
                break;
            }
        }
        handle.join().await;

        assert_eq!(events.len(), 4);
        assert!(matches!(events[1], MonitorEvent::Mnet { event: DecoderEvent::Frame { .. }, .. }));
        assert!(matches!(events[2], MonitorEvent::Mnet { event: DecoderEvent::IdleGap { .. }, .. }));
    }

    #[tokio::test]
    async fn test_port_reader_survives_zero_byte_read() {
        let (mut tx_side, rx_side) = tokio::io::duplex(64);
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let handle = MnetLineReader::new(
            LineId(1),
            "port".into(),
            rx_side,
            UnitFilter::disabled(),
            Duration::from_millis(10),
            event_tx,
        )
        .close_on_eof(false)
        .spawn();
        let _ = next(&mut event_rx).await;

        let raw = encode_frame([0xBD, 0x01, 0x02, 0x7F], &[0x25, 0x01], ACK);
        tx_side.write_all(&raw).await.unwrap();
        drop(tx_side);

        assert!(matches!(
            next(&mut event_rx).await,
            MonitorEvent::Mnet { event: DecoderEvent::Frame { .. }, .. }
        ));
        assert!(matches!(
            next(&mut event_rx).await,
            MonitorEvent::Mnet { event: DecoderEvent::IdleGap { .. }, .. }
        ));

        // Zero-byte reads keep the line open and quiet
        let quiet = tokio::time::timeout(Duration::from_millis(100), event_rx.recv()).await;
        assert!(quiet.is_err());

        handle.shutdown().await;
        assert_eq!(
            next(&mut event_rx).await,
            MonitorEvent::LineClosed { line: LineId(1) }
        );
    }

    #[tokio::test]
    async fn test_bridge_reader_forwards_lines() {
        let (mut tx_side, rx_side) = tokio::io::duplex(64);
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let handle = BridgeLineReader::new(LineId(2), "duplex".into(), rx_side, event_tx).spawn();

        assert!(matches!(
            next(&mut event_rx).await,
            MonitorEvent::LineOpened { kind: LineKind::Bridge, .. }
        ));

        tx_side.write_all(b">\r\non 101\r\n").await.unwrap();
        assert_eq!(
            next(&mut event_rx).await,
            MonitorEvent::BridgeText {
                line: LineId(2),
                text: "on 101".into()
            }
        );

        drop(tx_side);
        assert_eq!(
            next(&mut event_rx).await,
            MonitorEvent::LineClosed { line: LineId(2) }
        );
        handle.join().await;
    }
}
