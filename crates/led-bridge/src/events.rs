//! Event stream for bridge activity
//!
//! Observers (tests, logging, future push APIs) subscribe through
//! [`BridgeService::subscribe`](crate::BridgeService::subscribe). Emitting
//! never blocks; with no subscribers events are simply dropped.

use std::fmt;

use crate::state::DeviceState;

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Closed on request (shutdown, reconnect)
    Closed,
    /// The transport reported end of stream
    Eof,
    /// The transport failed while reading
    ReadError(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Closed => f.write_str("closed"),
            DisconnectReason::Eof => f.write_str("end of stream"),
            DisconnectReason::ReadError(e) => write!(f, "read error: {}", e),
        }
    }
}

/// Bridge activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A connection was opened and its ingestion task started
    Connected {
        /// Port path
        port: String,
    },

    /// A connection's ingestion task has stopped
    Disconnected {
        /// Port path
        port: String,
        /// Why it stopped
        reason: DisconnectReason,
    },

    /// A status line was received and fully applied to the device state
    LineReceived {
        /// Trimmed line text
        line: String,
    },

    /// The device state changed as a result of a status line
    StateChanged {
        /// New LED states
        led_states: DeviceState,
    },

    /// A command was written to the transport
    CommandSent {
        /// Command token without terminator
        command: String,
    },
}
