//! LED Controller Simulation Library
//!
//! This crate provides a stand-in for the real controller firmware so the
//! bridge can be exercised without hardware. It includes:
//!
//! - **VirtualController**: Switches five LEDs and answers with the same
//!   status phrases the firmware prints
//! - **run_virtual_controller_task**: Drives a controller over any async byte
//!   stream, typically one half of a `tokio::io::duplex` pair
//!
//! # Example
//!
//! ```rust
//! use led_sim::VirtualController;
//!
//! let mut controller = VirtualController::new("bench");
//!
//! assert_eq!(controller.process_line("ON3"), vec!["Pin 3 ON".to_string()]);
//! assert_eq!(controller.leds(), [false, true, false, false, false]);
//! ```

pub mod controller;
pub mod controller_task;
pub mod error;

pub use controller::VirtualController;
pub use controller_task::{run_virtual_controller_task, VirtualControllerCommand};
pub use error::SimError;
