//! Bridge service
//!
//! The single owner of the controller connection. The HTTP layer holds an
//! `Arc<BridgeService>` and calls into it from any number of concurrent
//! requests; the connection's ingestion task runs alongside.
//!
//! Commands and status updates are decoupled: a command is written and
//! forgotten, and the device's status line arrives on its own schedule.
//! [`BridgeService::dispatch`] therefore waits a fixed settle delay and
//! returns whatever state has been observed by then. The returned snapshot is
//! best effort and may not reflect the command that was just sent.

use std::sync::Arc;
use std::time::Duration;

use led_detect::{
    find_device, DetectError, PortEnumerator, PortScanner, ScannerConfig, SelectionRules,
};
use led_protocol::{LedCommand, Pin};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::{ConnectError, SendError};
use crate::events::BridgeEvent;
use crate::state::{BridgeSnapshot, DeviceState, SharedState};
use crate::transport::{PortOpener, SerialOpener, DEFAULT_BAUD_RATE};

/// Default wait between sending a command and reading state back
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Bridge configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Serial data rate
    pub baud_rate: u32,
    /// Wait after a command before returning state
    pub settle_delay: Duration,
    /// Discovery rules
    pub selection: SelectionRules,
    /// Explicit port path; skips discovery when set
    pub device_path: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            selection: SelectionRules::default(),
            device_path: None,
        }
    }
}

/// Orchestrates discovery, the connection, and the device state
pub struct BridgeService {
    config: BridgeConfig,
    enumerator: Arc<dyn PortEnumerator>,
    opener: Arc<dyn PortOpener>,
    shared: Arc<SharedState>,
    connection: Mutex<Option<Connection>>,
    events: broadcast::Sender<BridgeEvent>,
}

impl BridgeService {
    /// Create a disconnected bridge with custom discovery and transport
    pub fn new(
        config: BridgeConfig,
        enumerator: Arc<dyn PortEnumerator>,
        opener: Arc<dyn PortOpener>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            config,
            enumerator,
            opener,
            shared: Arc::new(SharedState::new()),
            connection: Mutex::new(None),
            events,
        }
    }

    /// Create a disconnected bridge for real serial hardware
    pub fn with_serial(config: BridgeConfig, scanner: ScannerConfig) -> Self {
        Self::new(
            config,
            Arc::new(PortScanner::with_config(scanner)),
            Arc::new(SerialOpener),
        )
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Subscribe to bridge events
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Current connection flag and LED states, read atomically
    pub fn status(&self) -> BridgeSnapshot {
        self.shared.snapshot()
    }

    /// Whether a connection is open
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Current LED states
    pub fn led_states(&self) -> DeviceState {
        self.shared.led_states()
    }

    /// Resolve the port to connect to
    ///
    /// Uses the configured device path if there is one, otherwise runs
    /// discovery.
    pub fn find_device(&self) -> Result<String, DetectError> {
        if let Some(path) = &self.config.device_path {
            debug!("Using configured device path {}", path);
            return Ok(path.clone());
        }

        info!("Searching for LED controller...");
        find_device(self.enumerator.as_ref(), &self.config.selection)
    }

    /// Open `path`, replacing any existing connection
    ///
    /// The old connection's ingestion task is fully stopped before the new
    /// port is opened.
    pub async fn connect(&self, path: &str) -> Result<(), ConnectError> {
        let mut guard = self.connection.lock().await;
        self.close_locked(&mut guard).await;
        *guard = Some(self.open(path)?);
        Ok(())
    }

    /// Close the connection if there is one
    pub async fn close(&self) {
        let mut guard = self.connection.lock().await;
        self.close_locked(&mut guard).await;
    }

    /// Close, rediscover, and connect again
    ///
    /// Returns the port that was connected.
    pub async fn try_reconnect(&self) -> Result<String, ConnectError> {
        let mut guard = self.connection.lock().await;
        self.close_locked(&mut guard).await;

        let path = self.find_device()?;
        *guard = Some(self.open(&path)?);
        Ok(path)
    }

    /// Close, rediscover, and connect again, reporting only success
    pub async fn reconnect(&self) -> bool {
        match self.try_reconnect().await {
            Ok(port) => {
                info!("LED controller reconnected on {}", port);
                true
            }
            Err(e) => {
                warn!("Failed to reconnect to LED controller: {}", e);
                false
            }
        }
    }

    /// Write a command to the controller
    ///
    /// Fails with [`SendError::NotConnected`] without touching the transport
    /// when no connection is open. The connection lock is released before
    /// the write is awaited, so a stalled device never blocks `reconnect`.
    pub async fn send(&self, command: &LedCommand) -> Result<(), SendError> {
        let writer = {
            let mut guard = self.connection.lock().await;

            if !self.shared.is_connected() {
                // The ingestion task may have died on its own; reap it
                self.close_locked(&mut guard).await;
                return Err(SendError::NotConnected);
            }

            guard.as_ref().ok_or(SendError::NotConnected)?.writer()
        };

        info!("Sending command: {}", command);
        writer.write(command.encode()).await?;
        debug!("Command sent: {}", command);

        let _ = self.events.send(BridgeEvent::CommandSent {
            command: command.token(),
        });
        Ok(())
    }

    /// Send a command, wait the settle delay, and return the observed state
    pub async fn dispatch(&self, command: LedCommand) -> Result<BridgeSnapshot, SendError> {
        self.send(&command).await?;
        tokio::time::sleep(self.config.settle_delay).await;
        Ok(self.status())
    }

    /// Switch one LED, wait the settle delay, and return the observed state
    pub async fn set_channel(&self, pin: Pin, on: bool) -> Result<BridgeSnapshot, SendError> {
        self.dispatch(LedCommand::set(pin, on)).await
    }

    fn open(&self, path: &str) -> Result<Connection, ConnectError> {
        Connection::open(
            self.opener.as_ref(),
            path,
            self.config.baud_rate,
            self.shared.clone(),
            self.events.clone(),
        )
    }

    async fn close_locked(&self, slot: &mut Option<Connection>) {
        if let Some(mut conn) = slot.take() {
            conn.close().await;
        }
        // Covers a task that panicked instead of exiting cleanly
        self.shared.set_connected(false);
    }
}
