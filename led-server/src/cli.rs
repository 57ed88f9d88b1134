//! Command-line arguments
//!
//! Every flag is optional; anything left unset falls back to the settings
//! file and then to built-in defaults.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "ledbridge",
    version,
    about = "HTTP bridge for a serial-attached LED controller"
)]
pub struct Args {
    /// HTTP port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind the HTTP server to
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    pub baud: Option<u32>,

    /// Milliseconds to wait after a command before reporting state
    #[arg(long, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// Serial port to use, skipping discovery
    #[arg(short, long, value_name = "PATH")]
    pub device: Option<String>,

    /// Port to try when no manufacturer matches
    #[arg(long, value_name = "PATH")]
    pub fallback_port: Option<String>,

    /// Talk to a simulated controller instead of hardware
    #[arg(long)]
    pub simulate: bool,

    /// Settings file to read instead of the default location
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// List candidate serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}
