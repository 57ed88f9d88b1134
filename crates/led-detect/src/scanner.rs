//! Serial port scanner
//!
//! This module provides serial port enumeration.

use serde::{Deserialize, Serialize};
use serialport::{available_ports, SerialPortInfo, SerialPortType};
use tracing::{debug, info, trace};

use crate::error::DetectError;
use crate::usb_ids;

/// A serial port that might have the LED controller behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePort {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    /// USB manufacturer string
    pub manufacturer: Option<String>,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB serial number (if available)
    pub serial_number: Option<String>,
    /// USB product string
    pub product: Option<String>,
}

impl CandidatePort {
    /// Candidate with only a path and manufacturer string
    pub fn new(port: impl Into<String>, manufacturer: Option<&str>) -> Self {
        Self {
            port: port.into(),
            manufacturer: manufacturer.map(str::to_string),
            vid: None,
            pid: None,
            serial_number: None,
            product: None,
        }
    }

    /// Build from an OS port listing; non-USB ports carry no metadata
    fn from_serialport(info: SerialPortInfo) -> Self {
        let SerialPortType::UsbPort(usb) = info.port_type else {
            return Self::new(info.port_name, None);
        };

        Self {
            port: info.port_name,
            vid: Some(usb.vid),
            pid: Some(usb.pid),
            manufacturer: usb.manufacturer,
            product: usb.product,
            serial_number: usb.serial_number,
        }
    }

    /// Known adapter name derived from the USB IDs, if any
    pub fn adapter_hint(&self) -> Option<&'static str> {
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) if usb_ids::is_known_adapter(vid, pid) => {
                usb_ids::adapter_name(vid)
            }
            _ => None,
        }
    }
}

/// Source of candidate ports
///
/// `PortScanner` asks the OS. Tests and the simulator supply fixed lists.
pub trait PortEnumerator: Send + Sync {
    /// Enumerate all candidate ports
    fn enumerate_ports(&self) -> Result<Vec<CandidatePort>, DetectError>;
}

/// Fixed candidate list
impl PortEnumerator for Vec<CandidatePort> {
    fn enumerate_ports(&self) -> Result<Vec<CandidatePort>, DetectError> {
        Ok(self.clone())
    }
}

/// Discovery filters applied before selection
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Port name fragments to leave out of the listing
    pub skip_patterns: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            skip_patterns: default_skip_patterns(),
        }
    }
}

/// Enumerates the host's serial ports
#[derive(Debug, Clone, Default)]
pub struct PortScanner {
    config: ScannerConfig,
}

impl PortScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    fn should_skip_port(&self, port: &CandidatePort) -> bool {
        let skip = self
            .config
            .skip_patterns
            .iter()
            .any(|pattern| port.port.contains(pattern.as_str()));
        if skip {
            trace!("Skipping {}", port.port);
        }
        skip
    }
}

impl PortEnumerator for PortScanner {
    fn enumerate_ports(&self) -> Result<Vec<CandidatePort>, DetectError> {
        debug!("Listing serial ports");
        let candidates: Vec<CandidatePort> = available_ports()
            .map_err(|e| DetectError::EnumerationFailed(e.to_string()))?
            .into_iter()
            .map(CandidatePort::from_serialport)
            .filter(|c| !self.should_skip_port(c))
            .collect();

        info!("{} candidate serial port(s)", candidates.len());
        for c in &candidates {
            debug!(
                "  {} - {}{}",
                c.port,
                c.manufacturer.as_deref().unwrap_or("unknown manufacturer"),
                c.adapter_hint()
                    .map(|hint| format!(" [{}]", hint))
                    .unwrap_or_default()
            );
        }

        Ok(candidates)
    }
}

/// Port name fragments that are never the controller
pub fn default_skip_patterns() -> Vec<String> {
    ["Bluetooth", "debug"].map(String::from).to_vec()
}
