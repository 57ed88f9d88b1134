//! Virtual LED controller
//!
//! Mimics the firmware's command handling: it switches LEDs and prints a
//! human-readable line for every command it receives. Effects are reported
//! by name and leave every LED off when they finish.

use led_protocol::{LedCommand, Pin, CHANNEL_COUNT};
use tracing::debug;

/// Simulated five-LED controller
pub struct VirtualController {
    /// Identifier for logging
    id: String,
    leds: [bool; CHANNEL_COUNT],
    /// Command lines received (for test verification)
    received_commands: Vec<String>,
}

impl VirtualController {
    /// Create a controller with every LED off
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            leds: [false; CHANNEL_COUNT],
            received_commands: Vec::new(),
        }
    }

    /// Get the identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current LED states, indexed by `pin - 2`
    pub fn leds(&self) -> [bool; CHANNEL_COUNT] {
        self.leds
    }

    /// State of one LED
    pub fn led(&self, pin: Pin) -> bool {
        self.leds[pin.index()]
    }

    /// Command lines received so far
    pub fn received_commands(&self) -> &[String] {
        &self.received_commands
    }

    /// Handle one command line and return the lines the firmware would print
    ///
    /// Blank lines are ignored and produce no output.
    pub fn process_line(&mut self, line: &str) -> Vec<String> {
        let line = line.trim();
        let Ok(command) = LedCommand::parse(line) else {
            return Vec::new();
        };

        debug!("Virtual controller {} processing {:?}", self.id, command);
        self.received_commands.push(line.to_string());

        match command {
            LedCommand::On(pin) => {
                self.leds[pin.index()] = true;
                vec![format!("Pin {} ON", pin)]
            }
            LedCommand::Off(pin) => {
                self.leds[pin.index()] = false;
                vec![format!("Pin {} OFF", pin)]
            }
            LedCommand::AllOn => {
                self.leds = [true; CHANNEL_COUNT];
                vec!["All LEDs ON".to_string()]
            }
            LedCommand::AllOff => {
                self.leds = [false; CHANNEL_COUNT];
                vec!["All LEDs OFF".to_string()]
            }
            LedCommand::Effect(effect) => {
                self.leds = [false; CHANNEL_COUNT];
                vec![
                    format!("Effect: {}", effect.token()),
                    "All LEDs OFF".to_string(),
                ]
            }
            LedCommand::Raw(token) => vec![format!("Unknown command: {}", token)],
        }
    }
}
