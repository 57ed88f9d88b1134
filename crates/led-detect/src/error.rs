//! Error types for device discovery

use thiserror::Error;

/// Errors that can occur during discovery
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// No candidate matched the selection rules
    #[error("no LED controller found among {candidates} serial port(s)")]
    DeviceNotFound { candidates: usize },
}
