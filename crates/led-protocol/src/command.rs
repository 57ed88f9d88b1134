//! Command vocabulary (host → device)
//!
//! Commands are bare ASCII tokens terminated by a single `\n`. The device
//! understands per-pin switches, bulk switches and a handful of light effects.
//! Tokens outside that vocabulary are still forwarded verbatim so newer
//! firmware can grow commands without a bridge update.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::Pin;

/// Line terminator appended to every outbound command
pub const TERMINATOR: u8 = b'\n';

/// Light effects built into the controller firmware
///
/// The bridge does not know what these look like on the device; it only
/// names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    Rainbow,
    Blink,
    Wave,
    Random,
}

impl Effect {
    /// All known effects
    pub const ALL: [Effect; 4] = [Effect::Rainbow, Effect::Blink, Effect::Wave, Effect::Random];

    /// Wire token for this effect
    pub fn token(&self) -> &'static str {
        match self {
            Effect::Rainbow => "RAINBOW",
            Effect::Blink => "BLINK",
            Effect::Wave => "WAVE",
            Effect::Random => "RANDOM",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.token() == token)
    }
}

/// A command sent to the LED controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedCommand {
    /// `ON<pin>`
    On(Pin),
    /// `OFF<pin>`
    Off(Pin),
    /// `ALLON`
    AllOn,
    /// `ALLOFF`
    AllOff,
    /// One of the firmware light effects
    Effect(Effect),
    /// Anything else, forwarded unchanged
    Raw(String),
}

impl LedCommand {
    /// Command that switches a single pin
    pub fn set(pin: Pin, on: bool) -> Self {
        if on {
            Self::On(pin)
        } else {
            Self::Off(pin)
        }
    }

    /// Parse a command token supplied by an API caller
    ///
    /// Rejects empty tokens and tokens containing line breaks; anything else
    /// is accepted, falling back to [`LedCommand::Raw`]. A token only maps to
    /// a typed variant when that variant encodes back to the same text, so
    /// the device always receives exactly what the caller sent.
    pub fn parse(token: &str) -> Result<Self, ProtocolError> {
        if token.is_empty() {
            return Err(ProtocolError::EmptyCommand);
        }
        if token.contains(['\n', '\r']) {
            return Err(ProtocolError::EmbeddedNewline(token.to_string()));
        }

        let cmd = match token {
            "ALLON" => Self::AllOn,
            "ALLOFF" => Self::AllOff,
            _ => {
                if let Some(effect) = Effect::from_token(token) {
                    Self::Effect(effect)
                } else if let Some(pin) = parse_pin_suffix(token, "OFF") {
                    Self::Off(pin)
                } else if let Some(pin) = parse_pin_suffix(token, "ON") {
                    Self::On(pin)
                } else {
                    Self::Raw(token.to_string())
                }
            }
        };

        Ok(cmd)
    }

    /// Wire token without terminator
    pub fn token(&self) -> String {
        self.to_string()
    }

    /// Encode this command to its wire format, terminator included
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.to_string().into_bytes();
        bytes.push(TERMINATOR);
        bytes
    }
}

/// Parse `<prefix><pin>` where the pin is in range and written canonically
fn parse_pin_suffix(token: &str, prefix: &str) -> Option<Pin> {
    let digits = token.strip_prefix(prefix)?;
    let pin = Pin::new(digits.parse().ok()?).ok()?;
    (pin.to_string() == digits).then_some(pin)
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedCommand::On(pin) => write!(f, "ON{}", pin),
            LedCommand::Off(pin) => write!(f, "OFF{}", pin),
            LedCommand::AllOn => f.write_str("ALLON"),
            LedCommand::AllOff => f.write_str("ALLOFF"),
            LedCommand::Effect(effect) => f.write_str(effect.token()),
            LedCommand::Raw(token) => f.write_str(token),
        }
    }
}

impl FromStr for LedCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
