//! Transport abstraction
//!
//! The bridge talks to any bidirectional byte stream. Real hardware uses
//! `tokio_serial::SerialStream`; tests and the simulator use
//! `tokio::io::DuplexStream`.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;
use tracing::debug;

use crate::error::ConnectError;

/// Default serial data rate of the controller firmware
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// A bidirectional byte stream to the controller
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Boxed transport as handed out by a [`PortOpener`]
pub type BoxedTransport = Box<dyn Transport>;

/// Opens transports by path
pub trait PortOpener: Send + Sync {
    /// Open the endpoint at `path`
    fn open(&self, path: &str, baud_rate: u32) -> Result<BoxedTransport, ConnectError>;
}

/// Opens real serial ports through tokio-serial
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    fn open(&self, path: &str, baud_rate: u32) -> Result<BoxedTransport, ConnectError> {
        debug!("Opening {} at {} baud", path, baud_rate);

        let stream = tokio_serial::new(path, baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|e| ConnectError::OpenFailed {
                port: path.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(stream))
    }
}
