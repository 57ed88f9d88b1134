//! LED Controller Serial Bridge
//!
//! This crate keeps an in-memory mirror of a five-LED controller's state in
//! sync with the device over a serial link, and sends it commands on behalf
//! of a host API.
//!
//! # Architecture
//!
//! - [`BridgeService`] owns at most one [`Connection`] and the [`SharedState`]
//! - Each `Connection` runs one ingestion task that owns the transport. It
//!   frames inbound bytes into lines, parses status phrases, and applies
//!   them to the shared state in arrival order. Writes are handed to the same
//!   task over a channel and are bounded by [`WRITE_TIMEOUT`], so a device
//!   that stops reading cannot wedge ingestion or `reconnect`.
//! - Foreground calls (`status`, `dispatch`, `set_channel`, `reconnect`) may run
//!   concurrently with each other and with ingestion. State reads go through
//!   one mutex and are never torn.
//! - All activity is published as [`BridgeEvent`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use led_bridge::{BridgeConfig, BridgeService};
//! use led_detect::ScannerConfig;
//! use led_protocol::{LedCommand, Pin};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bridge = BridgeService::with_serial(BridgeConfig::default(), ScannerConfig::default());
//! if bridge.reconnect().await {
//!     let snapshot = bridge.set_channel(Pin::new(3)?, true).await?;
//!     println!("LEDs: {:?}", snapshot.led_states.as_array());
//!     bridge.dispatch(LedCommand::AllOff).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod events;
pub mod service;
pub mod state;
pub mod transport;

pub use connection::{Connection, ConnectionWriter, CLOSE_TIMEOUT, WRITE_TIMEOUT};
pub use error::{ConnectError, SendError};
pub use events::{BridgeEvent, DisconnectReason};
pub use service::{BridgeConfig, BridgeService, DEFAULT_SETTLE_DELAY};
pub use state::{BridgeSnapshot, DeviceState, SharedState};
pub use transport::{BoxedTransport, PortOpener, SerialOpener, Transport, DEFAULT_BAUD_RATE};
