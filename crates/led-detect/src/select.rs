//! Candidate selection
//!
//! Picks the controller's port out of an enumerated list using an ordered
//! rule set:
//!
//! 1. The first port whose manufacturer string contains any allow-listed
//!    fragment (case-sensitive).
//! 2. Otherwise the configured fallback path, if it was enumerated.
//! 3. Otherwise nothing.
//!
//! Selection never opens a port and never retries.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DetectError;
use crate::scanner::{CandidatePort, PortEnumerator};

/// Manufacturer fragments reported by common controller boards and USB-serial chips
pub const DEFAULT_MANUFACTURER_PATTERNS: [&str; 6] =
    ["Arduino", "FTDI", "CH340", "CP210", "wch.cn", "QinHeng"];

/// Ordered discovery rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRules {
    /// Manufacturer substrings that identify a controller
    pub manufacturer_patterns: Vec<String>,
    /// Port path to use when no manufacturer matches
    #[serde(default)]
    pub fallback_port: Option<String>,
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            manufacturer_patterns: DEFAULT_MANUFACTURER_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback_port: None,
        }
    }
}

impl SelectionRules {
    /// Set the fallback port path
    pub fn with_fallback(mut self, port: impl Into<String>) -> Self {
        self.fallback_port = Some(port.into());
        self
    }

    /// Does this candidate's manufacturer match the allow-list?
    pub fn matches_manufacturer(&self, candidate: &CandidatePort) -> bool {
        candidate.manufacturer.as_deref().is_some_and(|m| {
            self.manufacturer_patterns
                .iter()
                .any(|pattern| m.contains(pattern.as_str()))
        })
    }

    /// Apply the rules to a candidate list
    pub fn select_port<'a>(&self, candidates: &'a [CandidatePort]) -> Option<&'a CandidatePort> {
        if let Some(found) = candidates.iter().find(|c| self.matches_manufacturer(c)) {
            debug!(
                "{} matched manufacturer {:?}",
                found.port,
                found.manufacturer.as_deref().unwrap_or_default()
            );
            return Some(found);
        }

        let fallback = self.fallback_port.as_deref()?;
        let found = candidates.iter().find(|c| c.port == fallback);
        if found.is_some() {
            info!("Auto-detection failed, trying fallback port {}", fallback);
        }
        found
    }
}

/// Enumerate ports and pick the controller's path
pub fn find_device(
    enumerator: &dyn PortEnumerator,
    rules: &SelectionRules,
) -> Result<String, DetectError> {
    let candidates = enumerator.enumerate_ports()?;

    match rules.select_port(&candidates) {
        Some(port) => {
            info!("Selected {} for the LED controller", port.port);
            Ok(port.port.clone())
        }
        None => {
            info!(
                "LED controller not found. Available ports: {}",
                candidates
                    .iter()
                    .map(|c| format!(
                        "{} ({})",
                        c.port,
                        c.manufacturer.as_deref().unwrap_or("unknown")
                    ))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            Err(DetectError::DeviceNotFound {
                candidates: candidates.len(),
            })
        }
    }
}
