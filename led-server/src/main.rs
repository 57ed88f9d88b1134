//! LED Controller Bridge Server
//!
//! Serves a small JSON API that lets a mobile app switch the LEDs on a
//! USB-attached microcontroller and read back their state.

mod api;
mod cli;
mod error;
mod ports;
mod settings;
mod simulate;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use led_bridge::{BridgeEvent, BridgeService, DisconnectReason, PortOpener, SerialOpener};
use led_detect::{PortEnumerator, PortScanner};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Args;
use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ledbridge=info,led_protocol=info,led_detect=info,led_bridge=info,led_sim=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .with_args(&args);

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let (enumerator, opener): (Arc<dyn PortEnumerator>, Arc<dyn PortOpener>) = if args.simulate {
        info!("Using simulated LED controller");
        (
            Arc::new(simulate::SimulatedPorts),
            Arc::new(simulate::SimulatedOpener::default()),
        )
    } else {
        (
            Arc::new(PortScanner::with_config(settings.scanner_config())),
            Arc::new(SerialOpener),
        )
    };

    if args.list_ports {
        return ports::list_ports(enumerator.as_ref(), &settings.selection_rules());
    }

    info!("Starting LED controller bridge");
    let bridge = Arc::new(BridgeService::new(
        settings.bridge_config(),
        enumerator,
        opener,
    ));
    spawn_event_logger(&bridge);

    if settings.connect_on_startup && !bridge.reconnect().await {
        warn!("Starting without a controller; POST /reconnect to retry");
    }

    let addr = settings.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;
    info!("LED controller server running on http://{}", addr);

    axum::serve(listener, api::router(bridge.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    bridge.close().await;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down server...");
}

/// Surface unexpected disconnects, which would otherwise only show up as 503s
fn spawn_event_logger(bridge: &BridgeService) {
    let mut events = bridge.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BridgeEvent::Disconnected { port, reason }) if reason != DisconnectReason::Closed => {
                    warn!(
                        "Lost LED controller on {} ({}); POST /reconnect to retry",
                        port, reason
                    );
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => debug!("Event logger skipped {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
