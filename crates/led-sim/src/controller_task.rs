//! Virtual controller actor task
//!
//! Owns a [`VirtualController`] and talks to the bridge over an async stream.
//! The task uses a select! loop to:
//! - Read command lines from the stream and write back the controller's replies
//! - Inject unsolicited lines on request, as real firmware does at boot
//! - Handle shutdown commands from a channel

use led_protocol::LineFramer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::VirtualController;

/// Commands that can be sent to a virtual controller actor
#[derive(Debug, Clone)]
pub enum VirtualControllerCommand {
    /// Write a line to the host as if the firmware printed it
    Emit(String),
    /// Shutdown the virtual controller actor
    Shutdown,
}

/// Run the virtual controller actor task
///
/// Returns the controller once the stream closes or shutdown is requested, so
/// tests can inspect what it received.
pub async fn run_virtual_controller_task<S>(
    mut stream: S,
    mut controller: VirtualController,
    mut cmd_rx: mpsc::Receiver<VirtualControllerCommand>,
) -> Result<VirtualController, SimError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framer = LineFramer::new();
    let mut buf = [0u8; 256];

    info!("Starting virtual controller task for {}", controller.id());

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual controller stream closed for {}", controller.id());
                        break;
                    }
                    Ok(n) => {
                        framer.push_bytes(&buf[..n]);
                        while let Some(line) = framer.next_line() {
                            for reply in controller.process_line(&line) {
                                write_line(&mut stream, &reply).await?;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Virtual controller {} stream error: {}", controller.id(), e);
                        return Err(e.into());
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualControllerCommand::Emit(line)) => {
                        write_line(&mut stream, &line).await?;
                    }
                    Some(VirtualControllerCommand::Shutdown) => {
                        info!("Shutdown requested for virtual controller {}", controller.id());
                        break;
                    }
                    None => {
                        debug!("Command channel closed for virtual controller {}", controller.id());
                        break;
                    }
                }
            }
        }
    }

    info!("Virtual controller task ended for {}", controller.id());
    Ok(controller)
}

/// Print a line the way the firmware does, with `\r\n`
async fn write_line<S>(stream: &mut S, line: &str) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    debug!("Virtual controller reply: {}", line);
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};

    #[tokio::test]
    async fn test_replies_to_commands() {
        let (host, device) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let handle = tokio::spawn(run_virtual_controller_task(
            device,
            VirtualController::new("test"),
            cmd_rx,
        ));

        let (read_half, mut write_half) = tokio::io::split(host);
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"ON4\n").await.unwrap();
        let line = tokio::time::timeout(Duration::from_millis(200), lines.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.as_deref(), Some("Pin 4 ON"));

        write_half.write_all(b"RAINBOW\n").await.unwrap();
        let first = lines.next_line().await.unwrap();
        let second = lines.next_line().await.unwrap();
        assert_eq!(first.as_deref(), Some("Effect: RAINBOW"));
        assert_eq!(second.as_deref(), Some("All LEDs OFF"));

        cmd_tx.send(VirtualControllerCommand::Shutdown).await.unwrap();
        let controller = handle.await.unwrap().unwrap();
        assert_eq!(controller.received_commands(), ["ON4", "RAINBOW"]);
    }

    #[tokio::test]
    async fn test_split_command_across_writes() {
        let (mut host, device) = tokio::io::duplex(1024);
        let (_cmd_tx, cmd_rx) = mpsc::channel(8);

        let handle = tokio::spawn(run_virtual_controller_task(
            device,
            VirtualController::new("test"),
            cmd_rx,
        ));

        host.write_all(b"ALL").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        host.write_all(b"ON\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = host.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"All LEDs ON\r\n");

        drop(host);
        let controller = handle.await.unwrap().unwrap();
        assert_eq!(controller.leds(), [true; 5]);
    }

    #[tokio::test]
    async fn test_emit_unsolicited_line() {
        let (mut host, device) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let handle = tokio::spawn(run_virtual_controller_task(
            device,
            VirtualController::new("test"),
            cmd_rx,
        ));

        cmd_tx
            .send(VirtualControllerCommand::Emit("Ready".to_string()))
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let n = host.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"Ready\r\n");

        drop(cmd_tx);
        let result = tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .unwrap();
        assert!(result.unwrap().is_ok());
    }
}
