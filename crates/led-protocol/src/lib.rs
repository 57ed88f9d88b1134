//! LED Controller Line Protocol
//!
//! This crate provides parsing and encoding for the newline-delimited ASCII
//! protocol spoken by a microcontroller driving five LEDs on pins 2-6.
//!
//! # Architecture
//!
//! The protocol is asymmetric:
//! - Host → device: short command tokens (`ON3`, `OFF3`, `ALLON`, `RAINBOW`, ...)
//!   terminated by `\n`
//! - Device → host: human-readable status lines (`Pin 3 ON`, `All LEDs OFF`, ...)
//!   that the host scrapes for state changes
//!
//! There is no request/response correlation. Commands are fire-and-forget and
//! status lines are observed passively.
//!
//! # Example
//!
//! ```rust
//! use led_protocol::{LineFramer, StatusEvent, Pin};
//!
//! let mut framer = LineFramer::new();
//! framer.push_bytes(b"Pin 4 O");
//! assert!(framer.next_line().is_none());
//! framer.push_bytes(b"N\r\n");
//!
//! let line = framer.next_line().unwrap();
//! let events = led_protocol::parse_status_line(&line);
//! assert_eq!(events, vec![StatusEvent::Pin { pin: Pin::new(4).unwrap(), on: true }]);
//! ```

pub mod command;
pub mod error;
pub mod framer;
pub mod status;

use std::fmt;

pub use command::{Effect, LedCommand};
pub use error::ProtocolError;
pub use framer::LineFramer;
pub use status::{parse_status_line, StatusEvent};

/// Lowest controllable pin number
pub const MIN_PIN: u8 = 2;

/// Highest controllable pin number
pub const MAX_PIN: u8 = 6;

/// Number of LED channels on the controller
pub const CHANNEL_COUNT: usize = (MAX_PIN - MIN_PIN + 1) as usize;

/// All controllable pin numbers in channel order
pub const PINS: [u8; CHANNEL_COUNT] = [2, 3, 4, 5, 6];

/// A validated LED pin number in `2..=6`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct Pin(u8);

impl Pin {
    /// Validate a pin number
    ///
    /// Takes a wide integer so callers can pass unvalidated user input
    /// (negative or huge numbers) straight through.
    pub fn new(number: i64) -> Result<Self, ProtocolError> {
        if (MIN_PIN as i64..=MAX_PIN as i64).contains(&number) {
            Ok(Self(number as u8))
        } else {
            Err(ProtocolError::PinOutOfRange(number))
        }
    }

    /// Pin for a channel index (`0` is pin 2)
    pub fn from_index(index: usize) -> Option<Self> {
        if index < CHANNEL_COUNT {
            Some(Self(MIN_PIN + index as u8))
        } else {
            None
        }
    }

    /// Raw pin number
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Position of this pin in the device state array
    pub fn index(&self) -> usize {
        (self.0 - MIN_PIN) as usize
    }

    /// Iterate over all pins in channel order
    pub fn all() -> impl Iterator<Item = Pin> {
        PINS.into_iter().map(Pin)
    }
}

impl TryFrom<u8> for Pin {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value as i64)
    }
}

impl From<Pin> for u8 {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
