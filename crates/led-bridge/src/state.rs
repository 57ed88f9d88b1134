//! Device state tracking

use std::sync::{Mutex, MutexGuard, PoisonError};

use led_protocol::{Pin, StatusEvent, CHANNEL_COUNT};
use serde::{Deserialize, Serialize};

/// Mirror of the controller's LED states, indexed by `pin - 2`
///
/// Serializes as a plain JSON array of booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceState([bool; CHANNEL_COUNT]);

impl DeviceState {
    /// All LEDs off
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a single pin
    pub fn get(&self, pin: Pin) -> bool {
        self.0[pin.index()]
    }

    /// Set a single pin
    pub fn set(&mut self, pin: Pin, on: bool) {
        self.0[pin.index()] = on;
    }

    /// Set every pin at once
    pub fn set_all(&mut self, on: bool) {
        self.0 = [on; CHANNEL_COUNT];
    }

    /// Apply a parsed status event, returning whether anything changed
    pub fn apply(&mut self, event: &StatusEvent) -> bool {
        let before = self.0;
        match *event {
            StatusEvent::Pin { pin, on } => self.set(pin, on),
            StatusEvent::AllOn => self.set_all(true),
            StatusEvent::AllOff => self.set_all(false),
        }
        before != self.0
    }

    /// States in channel order
    pub fn as_array(&self) -> [bool; CHANNEL_COUNT] {
        self.0
    }

    /// Iterate over `(pin, on)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Pin, bool)> + '_ {
        Pin::all().zip(self.0.iter().copied())
    }
}

impl From<[bool; CHANNEL_COUNT]> for DeviceState {
    fn from(states: [bool; CHANNEL_COUNT]) -> Self {
        Self(states)
    }
}

/// Point-in-time view of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeSnapshot {
    /// Whether a connection is open
    pub connected: bool,
    /// Last known LED states
    pub led_states: DeviceState,
}

/// State shared between the ingestion task and foreground callers
///
/// A single mutex guards both the LED states and the connected flag so a
/// snapshot is always one consistent write.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<BridgeSnapshot>,
}

impl SharedState {
    /// Create with everything off and disconnected
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BridgeSnapshot> {
        // A panic while holding the lock cannot leave a torn array behind
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> BridgeSnapshot {
        *self.lock()
    }

    /// Copy of the current LED states
    pub fn led_states(&self) -> DeviceState {
        self.lock().led_states
    }

    /// Whether a connection is open
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Update the connected flag, returning the previous value
    pub fn set_connected(&self, connected: bool) -> bool {
        std::mem::replace(&mut self.lock().connected, connected)
    }

    /// Apply a status event; returns the new LED states if they changed
    pub fn apply(&self, event: &StatusEvent) -> Option<DeviceState> {
        let mut inner = self.lock();
        if inner.led_states.apply(event) {
            Some(inner.led_states)
        } else {
            None
        }
    }
}
