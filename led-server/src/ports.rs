//! `--list-ports` output

use led_detect::{CandidatePort, PortEnumerator, SelectionRules};

/// One line describing a candidate port
///
/// The port discovery would pick is marked with `*`.
pub fn describe(candidate: &CandidatePort, selected: bool) -> String {
    let mut line = format!(
        "{} {}  {}",
        if selected { "*" } else { " " },
        candidate.port,
        candidate.manufacturer.as_deref().unwrap_or("unknown")
    );

    if let (Some(vid), Some(pid)) = (candidate.vid, candidate.pid) {
        line.push_str(&format!("  {:04x}:{:04x}", vid, pid));
    }
    if let Some(hint) = candidate.adapter_hint() {
        line.push_str(&format!("  [{}]", hint));
    }
    line
}

/// Print every candidate port to stdout
pub fn list_ports(enumerator: &dyn PortEnumerator, rules: &SelectionRules) -> anyhow::Result<()> {
    let candidates = enumerator.enumerate_ports()?;
    if candidates.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    let selected = rules.select_port(&candidates).map(|c| c.port.as_str());
    for candidate in &candidates {
        println!("{}", describe(candidate, selected == Some(candidate.port.as_str())));
    }
    if selected.is_none() {
        println!("No port matches the selection rules");
    }
    Ok(())
}
