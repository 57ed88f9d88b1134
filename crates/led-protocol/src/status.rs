//! Status line parsing (device → host)
//!
//! The controller reports state changes as free text. Three phrases carry
//! meaning; everything else is chatter:
//!
//! - `Pin <n> ON` / `Pin <n> OFF` anywhere in the line
//! - `All LEDs ON`
//! - `All LEDs OFF`
//!
//! The rules are independent, so a single line can yield more than one event.
//! Events are returned in rule order: pin report, then all-on, then all-off.

use tracing::trace;

use crate::Pin;

const PIN_PREFIX: &str = "Pin ";
const ALL_ON_PHRASE: &str = "All LEDs ON";
const ALL_OFF_PHRASE: &str = "All LEDs OFF";

/// A state change reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusEvent {
    /// A single pin changed state
    Pin { pin: Pin, on: bool },
    /// Every LED was switched on
    AllOn,
    /// Every LED was switched off
    AllOff,
}

/// Interpret one framed status line
///
/// Never fails: unrecognised lines and out-of-range pins produce no events.
pub fn parse_status_line(line: &str) -> Vec<StatusEvent> {
    let mut events = Vec::new();

    if let Some((digits, on)) = find_pin_report(line) {
        // Overflowing digit strings are as out of range as any other
        match digits.parse::<i64>().ok().map(Pin::new) {
            Some(Ok(pin)) => events.push(StatusEvent::Pin { pin, on }),
            _ => trace!("Ignoring report for out-of-range pin {}", digits),
        }
    }

    if line.contains(ALL_ON_PHRASE) {
        events.push(StatusEvent::AllOn);
    }

    if line.contains(ALL_OFF_PHRASE) {
        events.push(StatusEvent::AllOff);
    }

    events
}

/// Find the leftmost `Pin <digits> ON|OFF` occurrence
///
/// Returns the digit run and whether the state is ON. Like an unanchored
/// pattern match, `Pin 3 ONLINE` still counts as `Pin 3 ON`.
fn find_pin_report(line: &str) -> Option<(&str, bool)> {
    let mut search_from = 0;

    while let Some(offset) = line[search_from..].find(PIN_PREFIX) {
        let prefix_at = search_from + offset;
        let after = &line[prefix_at + PIN_PREFIX.len()..];

        let digit_len = after.bytes().take_while(u8::is_ascii_digit).count();
        if digit_len > 0 {
            if let Some(state) = after[digit_len..].strip_prefix(' ') {
                if state.starts_with("ON") {
                    return Some((&after[..digit_len], true));
                }
                if state.starts_with("OFF") {
                    return Some((&after[..digit_len], false));
                }
            }
        }

        search_from = prefix_at + 1;
    }

    None
}
