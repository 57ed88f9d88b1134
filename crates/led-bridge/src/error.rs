//! Error types for the bridge

use std::io;

use led_detect::DetectError;
use thiserror::Error;

/// Errors that can occur while establishing a connection
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Discovery did not produce a port
    #[error(transparent)]
    Discovery(#[from] DetectError),

    /// Failed to open serial port
    #[error("failed to open port {port}: {reason}")]
    OpenFailed { port: String, reason: String },
}

/// Errors that can occur while sending a command
#[derive(Debug, Error)]
pub enum SendError {
    /// No open connection to write to
    #[error("LED controller not connected")]
    NotConnected,

    /// The transport rejected the write
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),
}
