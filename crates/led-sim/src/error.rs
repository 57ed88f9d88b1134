//! Error types for the simulator

use thiserror::Error;

/// Errors from the simulated controller task
#[derive(Debug, Error)]
pub enum SimError {
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}
