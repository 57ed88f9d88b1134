//! LED Controller Port Detection Library
//!
//! This crate provides serial port enumeration and rule-based selection of
//! the port an LED controller board is attached to.
//!
//! # Example
//!
//! ```rust,no_run
//! use led_detect::{find_device, PortScanner, SelectionRules};
//!
//! let scanner = PortScanner::new();
//! match find_device(&scanner, &SelectionRules::default()) {
//!     Ok(port) => println!("Controller on {}", port),
//!     Err(e) => println!("{}", e),
//! }
//! ```

pub mod error;
pub mod scanner;
pub mod select;
pub mod usb_ids;

pub use error::DetectError;
pub use scanner::{default_skip_patterns, CandidatePort, PortEnumerator, PortScanner, ScannerConfig};
pub use select::{find_device, SelectionRules, DEFAULT_MANUFACTURER_PATTERNS};
