//! Connection lifecycle and the ingestion task
//!
//! Each open connection is owned by one spawned task. The task is the only
//! thing that touches the transport: it drains inbound bytes through the
//! line framer and status parser, and performs writes handed to it over a
//! command channel. Keeping reads and writes in one task means there is never
//! a second reader racing on the device state.

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use led_protocol::{parse_status_line, LineFramer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{ConnectError, SendError};
use crate::events::{BridgeEvent, DisconnectReason};
use crate::state::SharedState;
use crate::transport::{PortOpener, Transport};

/// Longest a single write may block the task before it is reported as failed
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest `close` waits for the ingestion task before aborting it
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands that can be sent to a connection task
#[derive(Debug)]
pub(crate) enum ConnectionCommand {
    /// Write bytes to the transport and report the outcome
    Write {
        /// Encoded command, terminator included
        data: Vec<u8>,
        /// Write outcome
        response: oneshot::Sender<std::io::Result<()>>,
    },
    /// Stop the task and release the transport
    Shutdown,
}

/// An open connection to the controller
pub struct Connection {
    port: String,
    cmd_tx: mpsc::Sender<ConnectionCommand>,
    task: Option<JoinHandle<()>>,
    shared: Arc<SharedState>,
    events: broadcast::Sender<BridgeEvent>,
}

impl Connection {
    /// Open `path` through `opener` and start ingesting
    pub fn open(
        opener: &dyn PortOpener,
        path: &str,
        baud_rate: u32,
        shared: Arc<SharedState>,
        events: broadcast::Sender<BridgeEvent>,
    ) -> Result<Self, ConnectError> {
        info!("Attempting connection to {}...", path);
        let io = opener.open(path, baud_rate)?;
        Ok(Self::spawn(path.to_string(), io, shared, events))
    }

    /// Start the ingestion task over an already-open transport
    ///
    /// Marks the shared state connected before returning.
    pub fn spawn<T>(
        port: String,
        io: T,
        shared: Arc<SharedState>,
        events: broadcast::Sender<BridgeEvent>,
    ) -> Self
    where
        T: Transport + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        shared.set_connected(true);
        let _ = events.send(BridgeEvent::Connected { port: port.clone() });
        info!("Serial port {} opened, controller connected", port);

        let task = IngestTask {
            port: port.clone(),
            io,
            framer: LineFramer::new(),
            shared: shared.clone(),
            events: events.clone(),
            buffer: vec![0u8; 1024],
        };
        let handle = tokio::spawn(task.run(cmd_rx));

        Self {
            port,
            cmd_tx,
            task: Some(handle),
            shared,
            events,
        }
    }

    /// Port path this connection was opened on
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Whether the ingestion task is still running
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Handle for writing without borrowing the connection
    pub fn writer(&self) -> ConnectionWriter {
        ConnectionWriter {
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Write an encoded command and wait for the transport's verdict
    pub async fn write(&self, data: Vec<u8>) -> Result<(), SendError> {
        self.writer().write(data).await
    }

    /// Stop the ingestion task and release the transport
    ///
    /// A task stuck in a write is aborted after [`CLOSE_TIMEOUT`]; its
    /// in-flight write then fails with [`SendError::NotConnected`]. Returns
    /// once the task is gone. Calling it again is a no-op.
    pub async fn close(&mut self) {
        let Some(mut task) = self.task.take() else {
            return;
        };

        debug!("Closing connection on {}", self.port);
        let _ = self.cmd_tx.try_send(ConnectionCommand::Shutdown);

        match tokio::time::timeout(CLOSE_TIMEOUT, &mut task).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => warn!("Ingestion task for {} ended abnormally: {}", self.port, e),
            Err(_) => {
                warn!("Ingestion task for {} did not stop, aborting", self.port);
                task.abort();
                if let Ok(()) = task.await {
                    return;
                }
            }
        }

        // The task never reached its own cleanup
        self.shared.set_connected(false);
        let _ = self.events.send(BridgeEvent::Disconnected {
            port: self.port.clone(),
            reason: DisconnectReason::Closed,
        });
    }
}

/// Cloneable write side of a [`Connection`]
///
/// Waiting on a write through this handle does not hold whatever guards the
/// connection itself.
#[derive(Debug, Clone)]
pub struct ConnectionWriter {
    cmd_tx: mpsc::Sender<ConnectionCommand>,
}

impl ConnectionWriter {
    /// Queue an encoded command and wait for the transport's verdict
    ///
    /// If the task has already stopped, or stops before performing the
    /// write, this fails with [`SendError::NotConnected`].
    pub async fn write(&self, data: Vec<u8>) -> Result<(), SendError> {
        let (response, result) = oneshot::channel();
        self.cmd_tx
            .send(ConnectionCommand::Write { data, response })
            .await
            .map_err(|_| SendError::NotConnected)?;

        match result.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SendError::WriteFailed(e)),
            Err(_) => Err(SendError::NotConnected),
        }
    }
}

/// Owns the transport for the lifetime of a connection
struct IngestTask<T> {
    port: String,
    io: T,
    framer: LineFramer,
    shared: Arc<SharedState>,
    events: broadcast::Sender<BridgeEvent>,
    buffer: Vec<u8>,
}

impl<T> IngestTask<T>
where
    T: Transport,
{
    /// Main loop - runs until the transport fails, hits EOF, or shutdown is requested
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<ConnectionCommand>) {
        info!("Starting read loop on {}", self.port);

        let reason = loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ConnectionCommand::Write { data, response }) => {
                            let write = tokio::time::timeout(WRITE_TIMEOUT, self.write(&data));
                            let result = write.await.unwrap_or_else(|_| {
                                Err(std::io::Error::new(
                                    ErrorKind::TimedOut,
                                    format!("write stalled for {:?}", WRITE_TIMEOUT),
                                ))
                            });
                            if let Err(e) = &result {
                                warn!("Write error on {}: {}", self.port, e);
                            }
                            let _ = response.send(result);
                        }
                        Some(ConnectionCommand::Shutdown) | None => {
                            info!("Shutdown requested for {}", self.port);
                            break DisconnectReason::Closed;
                        }
                    }
                }

                result = self.io.read(&mut self.buffer) => {
                    match result {
                        Ok(0) => {
                            info!("Serial port {} closed", self.port);
                            break DisconnectReason::Eof;
                        }
                        Ok(n) => self.ingest(n),
                        Err(e) if matches!(
                            e.kind(),
                            ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                        ) => {}
                        Err(e) => {
                            warn!("Serial port error on {}: {}", self.port, e);
                            break DisconnectReason::ReadError(e.to_string());
                        }
                    }
                }
            }
        };

        // Queued writes fail with NotConnected once their responders drop
        drop(cmd_rx);

        self.shared.set_connected(false);
        info!("Read loop ended for {} ({})", self.port, reason);
        let _ = self.events.send(BridgeEvent::Disconnected {
            port: self.port.clone(),
            reason,
        });
    }

    /// Write data to the device
    async fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.io.write_all(data).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Feed freshly read bytes through the framer and parser
    fn ingest(&mut self, n: usize) {
        trace!(
            "Read {} bytes from {}: {:?}",
            n,
            self.port,
            String::from_utf8_lossy(&self.buffer[..n])
        );

        self.framer.push_bytes(&self.buffer[..n]);
        while let Some(line) = self.framer.next_line() {
            self.handle_line(line);
        }
    }

    /// Apply one status line to the shared state
    fn handle_line(&mut self, line: String) {
        debug!("Device: {}", line);

        for event in parse_status_line(&line) {
            if let Some(led_states) = self.shared.apply(&event) {
                info!("Updated LED state from {:?}: {:?}", event, led_states.as_array());
                let _ = self.events.send(BridgeEvent::StateChanged { led_states });
            }
        }

        let _ = self.events.send(BridgeEvent::LineReceived { line });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn setup() -> (Arc<SharedState>, broadcast::Sender<BridgeEvent>) {
        let (events, _) = broadcast::channel(64);
        (Arc::new(SharedState::new()), events)
    }

    async fn next_line_event(rx: &mut broadcast::Receiver<BridgeEvent>) -> String {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            if let BridgeEvent::LineReceived { line } = event {
                return line;
            }
        }
    }

    #[tokio::test]
    async fn test_ingests_lines_into_state() {
        let (shared, events) = setup();
        let mut rx = events.subscribe();
        let (mut device, host) = duplex(1024);

        let mut conn = Connection::spawn("test".into(), host, shared.clone(), events);
        assert!(shared.is_connected());

        device.write_all(b"Pin 3 ON\n").await.unwrap();
        assert_eq!(next_line_event(&mut rx).await, "Pin 3 ON");
        assert_eq!(
            shared.led_states().as_array(),
            [false, true, false, false, false]
        );

        conn.close().await;
        assert!(!shared.is_connected());
    }

    #[tokio::test]
    async fn test_split_line_across_reads() {
        let (shared, events) = setup();
        let mut rx = events.subscribe();
        let (mut device, host) = duplex(1024);

        let mut conn = Connection::spawn("test".into(), host, shared.clone(), events);

        device.write_all(b"Pin 4 O").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!shared.led_states().as_array()[2]);

        device.write_all(b"N\n").await.unwrap();
        assert_eq!(next_line_event(&mut rx).await, "Pin 4 ON");
        assert!(shared.led_states().as_array()[2]);

        conn.close().await;
    }

    #[tokio::test]
    async fn test_write_reaches_device() {
        let (shared, events) = setup();
        let (mut device, host) = duplex(1024);

        let mut conn = Connection::spawn("test".into(), host, shared, events);
        conn.write(b"ON3\n".to_vec()).await.unwrap();

        let mut buf = [0u8; 16];
        let n = device.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ON3\n");

        conn.close().await;
    }

    #[tokio::test]
    async fn test_eof_marks_disconnected() {
        let (shared, events) = setup();
        let mut rx = events.subscribe();
        let (device, host) = duplex(1024);

        let conn = Connection::spawn("test".into(), host, shared.clone(), events);
        drop(device);

        loop {
            match rx.recv().await.unwrap() {
                BridgeEvent::Disconnected { reason, .. } => {
                    assert_eq!(reason, DisconnectReason::Eof);
                    break;
                }
                _ => continue,
            }
        }

        assert!(!shared.is_connected());
        assert!(!conn.is_alive());
        assert!(matches!(
            conn.write(b"ON2\n".to_vec()).await,
            Err(SendError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_releases_transport() {
        let (shared, events) = setup();
        let (mut device, host) = duplex(1024);

        let mut conn = Connection::spawn("test".into(), host, shared, events);
        conn.close().await;
        conn.close().await;

        // Host side dropped with the task
        let mut buf = [0u8; 4];
        assert_eq!(device.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stalled_write_times_out_and_reads_resume() {
        let (shared, events) = setup();
        let mut rx = events.subscribe();
        // Nobody drains the device end, so a large write cannot complete
        let (mut device, host) = duplex(64);

        let mut conn = Connection::spawn("test".into(), host, shared.clone(), events);
        let result = conn.write(vec![b'x'; 500]).await;
        match result {
            Err(SendError::WriteFailed(e)) => assert_eq!(e.kind(), ErrorKind::TimedOut),
            other => panic!("expected a timed out write, got {:?}", other),
        }
        assert!(shared.is_connected());

        device.write_all(b"Pin 5 ON\n").await.unwrap();
        assert_eq!(next_line_event(&mut rx).await, "Pin 5 ON");
        assert!(shared.led_states().as_array()[3]);

        conn.close().await;
    }

    #[tokio::test]
    async fn test_close_aborts_task_stuck_in_write() {
        let (shared, events) = setup();
        let mut rx = events.subscribe();
        let (_device, host) = duplex(64);

        let mut conn = Connection::spawn("test".into(), host, shared.clone(), events);
        let writer = conn.writer();
        let pending = tokio::spawn(async move { writer.write(vec![b'x'; 500]).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(2), conn.close())
            .await
            .expect("close should not wait on the stalled write");

        assert!(!shared.is_connected());
        assert!(matches!(
            pending.await.unwrap(),
            Err(SendError::NotConnected)
        ));
        loop {
            if let BridgeEvent::Disconnected { reason, .. } = rx.recv().await.unwrap() {
                assert_eq!(reason, DisconnectReason::Closed);
                break;
            }
        }
    }
}
