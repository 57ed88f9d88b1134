//! Server settings
//!
//! Stored as JSON under the XDG config directory. A missing or unreadable
//! file yields defaults, and missing fields take their default values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use led_bridge::BridgeConfig;
use led_detect::{default_skip_patterns, ScannerConfig, SelectionRules};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cli::Args;

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// HTTP port
    pub listen_port: u16,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Wait after a command before reporting state, in milliseconds
    pub settle_ms: u64,
    /// Explicit port path; skips discovery when set
    pub device_path: Option<String>,
    /// Port to try when no manufacturer matches
    pub fallback_port: Option<String>,
    /// Manufacturer fragments that identify the controller, in priority order
    pub manufacturer_patterns: Vec<String>,
    /// Port name fragments to ignore during discovery
    pub skip_patterns: Vec<String>,
    /// Connect to the controller before serving requests
    pub connect_on_startup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let selection = SelectionRules::default();
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 3001,
            baud_rate: led_bridge::DEFAULT_BAUD_RATE,
            settle_ms: led_bridge::DEFAULT_SETTLE_DELAY.as_millis() as u64,
            device_path: None,
            fallback_port: selection.fallback_port,
            manufacturer_patterns: selection.manufacturer_patterns,
            skip_patterns: default_skip_patterns(),
            connect_on_startup: true,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for ledbridge
    /// Uses $XDG_CONFIG_HOME/ledbridge on Linux/macOS, falls back to ~/.config/ledbridge
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("ledbridge"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("ledbridge"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the default location
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("No settings at {}: {}", path.display(), e);
                return Self::default();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Ignoring unparsable settings file {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Overlay command-line flags
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(addr) = &args.listen {
            self.listen_addr = addr.clone();
        }
        if let Some(port) = args.port {
            self.listen_port = port;
        }
        if let Some(baud) = args.baud {
            self.baud_rate = baud;
        }
        if let Some(ms) = args.settle_ms {
            self.settle_ms = ms;
        }
        if let Some(device) = &args.device {
            self.device_path = Some(device.clone());
        }
        if let Some(fallback) = &args.fallback_port {
            self.fallback_port = Some(fallback.clone());
        }
        self
    }

    /// `addr:port` for the HTTP listener
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    pub fn selection_rules(&self) -> SelectionRules {
        SelectionRules {
            manufacturer_patterns: self.manufacturer_patterns.clone(),
            fallback_port: self.fallback_port.clone(),
        }
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            skip_patterns: self.skip_patterns.clone(),
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            baud_rate: self.baud_rate,
            settle_delay: Duration::from_millis(self.settle_ms),
            selection: self.selection_rules(),
            device_path: self.device_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ledbridge-settings-{}-{}.json",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.socket_addr(), "0.0.0.0:3001");
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.settle_ms, 100);
        assert!(settings.fallback_port.is_none());
        assert!(settings.device_path.is_none());
        assert_eq!(settings.manufacturer_patterns.len(), 6);
        assert_eq!(settings.skip_patterns, vec!["Bluetooth", "debug"]);
        assert!(settings.connect_on_startup);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = temp_file("partial", r#"{ "listen_port": 8080, "fallback_port": "COM5" }"#);
        let settings = Settings::load_from(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.listen_port, 8080);
        assert_eq!(settings.fallback_port.as_deref(), Some("COM5"));
        assert_eq!(settings.baud_rate, 9600);
        assert!(settings.connect_on_startup);
    }

    #[test]
    fn test_unparsable_file_yields_defaults() {
        let path = temp_file("garbage", "not json");
        let settings = Settings::load_from(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("ledbridge-settings-does-not-exist.json");
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_args_override_file() {
        let args = Args {
            port: Some(9000),
            settle_ms: Some(20),
            fallback_port: Some("/dev/ttyUSB1".to_string()),
            device: Some("/dev/ttyACM0".to_string()),
            ..Default::default()
        };
        let settings = Settings::default().with_args(&args);

        assert_eq!(settings.socket_addr(), "0.0.0.0:9000");
        let config = settings.bridge_config();
        assert_eq!(config.settle_delay, Duration::from_millis(20));
        assert_eq!(config.selection.fallback_port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.device_path.as_deref(), Some("/dev/ttyACM0"));
    }

    #[test]
    fn test_printed_config_includes_device_override() {
        let args = Args {
            device: Some("COM7".to_string()),
            ..Default::default()
        };
        let settings = Settings::default().with_args(&args);

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string_pretty(&settings).unwrap()).unwrap();
        assert_eq!(json["device_path"], "COM7");
        assert_eq!(
            Settings::default()
                .with_args(&Args::default())
                .bridge_config()
                .device_path,
            None
        );
    }

    #[test]
    fn test_file_can_pin_device() {
        let path = temp_file("device", r#"{ "device_path": "/dev/ttyACM3" }"#);
        let settings = Settings::load_from(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(
            settings.bridge_config().device_path.as_deref(),
            Some("/dev/ttyACM3")
        );
    }

    #[test]
    fn test_round_trip_through_json() {
        let settings = Settings {
            listen_port: 4000,
            connect_on_startup: false,
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        assert_eq!(serde_json::from_str::<Settings>(&json).unwrap(), settings);
    }
}
