//! Error types for the LED line protocol

use thiserror::Error;

/// Errors that can occur while building or parsing protocol values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Pin number outside the controllable range
    #[error("pin {0} out of range (must be between 2 and 6)")]
    PinOutOfRange(i64),

    /// Command token is empty after trimming
    #[error("command is empty")]
    EmptyCommand,

    /// Command token would split into multiple lines on the wire
    #[error("command contains a line break: {0:?}")]
    EmbeddedNewline(String),
}
