//! Simulated hardware for `--simulate`
//!
//! Discovery reports a single virtual port; opening it spawns a
//! [`VirtualController`] on the far end of an in-memory duplex stream.

use std::sync::{Mutex, PoisonError};

use led_bridge::{BoxedTransport, ConnectError, PortOpener};
use led_detect::{CandidatePort, DetectError, PortEnumerator};
use led_sim::{run_virtual_controller_task, VirtualController, VirtualControllerCommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Path of the simulated controller's port
pub const SIMULATED_PORT: &str = "sim://led-controller";

/// Line the simulated firmware prints after opening
const READY_BANNER: &str = "LED Controller Ready";

/// Reports the simulated controller as the only port
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedPorts;

impl PortEnumerator for SimulatedPorts {
    fn enumerate_ports(&self) -> Result<Vec<CandidatePort>, DetectError> {
        let mut port = CandidatePort::new(SIMULATED_PORT, Some("Arduino (simulated)"));
        port.vid = Some(0x2341);
        port.pid = Some(0x0043);
        port.product = Some("Virtual LED Controller".to_string());
        Ok(vec![port])
    }
}

/// Opens ports by starting a fresh simulated controller
#[derive(Default)]
pub struct SimulatedOpener {
    /// Keeps the current controller's command channel open
    controller: Mutex<Option<mpsc::Sender<VirtualControllerCommand>>>,
}

impl PortOpener for SimulatedOpener {
    fn open(&self, path: &str, baud_rate: u32) -> Result<BoxedTransport, ConnectError> {
        if path != SIMULATED_PORT {
            return Err(ConnectError::OpenFailed {
                port: path.to_string(),
                reason: "no such simulated port".to_string(),
            });
        }

        info!("Starting simulated controller at {} baud", baud_rate);
        let (device, host) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        tokio::spawn(async move {
            let controller = VirtualController::new(SIMULATED_PORT);
            match run_virtual_controller_task(device, controller, cmd_rx).await {
                Ok(controller) => debug!(
                    "Simulated controller stopped after {} commands",
                    controller.received_commands().len()
                ),
                Err(e) => warn!("Simulated controller failed: {}", e),
            }
        });

        let _ = cmd_tx.try_send(VirtualControllerCommand::Emit(READY_BANNER.to_string()));
        *self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cmd_tx);

        Ok(Box::new(host))
    }
}

/// Bridge wired to simulated hardware
#[cfg(test)]
pub fn simulated_bridge(config: led_bridge::BridgeConfig) -> led_bridge::BridgeService {
    led_bridge::BridgeService::new(
        config,
        std::sync::Arc::new(SimulatedPorts),
        std::sync::Arc::new(SimulatedOpener::default()),
    )
}
