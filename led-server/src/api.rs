//! HTTP API
//!
//! JSON in and out with camelCase field names. Every handler reads state
//! through the shared [`BridgeService`]; nothing here touches the serial port
//! directly.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use led_bridge::{BridgeService, DeviceState};
use led_protocol::{LedCommand, Pin, PINS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

pub type SharedBridge = Arc<BridgeService>;

/// Build the API router
pub fn router(bridge: SharedBridge) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/command", post(post_command))
        .route("/leds", get(get_leds))
        .route("/led/{pin}", post(post_led))
        .route("/reconnect", post(post_reconnect))
        .with_state(bridge)
}

/// Current time as an ISO 8601 UTC string with millisecond precision
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub connected: bool,
    pub led_states: DeviceState,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub success: bool,
    pub command: String,
    pub led_states: DeviceState,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedsResponse {
    pub led_states: DeviceState,
    pub pins: [u8; 5],
    pub timestamp: String,
}

/// Body of `POST /led/{pin}`; a missing `state` means off
#[derive(Debug, Default, Deserialize)]
pub struct LedRequest {
    #[serde(default)]
    pub state: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedResponse {
    pub success: bool,
    pub pin: u8,
    pub state: bool,
    pub led_states: DeviceState,
}

#[derive(Debug, Serialize)]
pub struct ReconnectResponse {
    pub success: bool,
    pub message: String,
}

pub async fn get_status(State(bridge): State<SharedBridge>) -> Json<StatusResponse> {
    let snapshot = bridge.status();
    Json(StatusResponse {
        connected: snapshot.connected,
        led_states: snapshot.led_states,
        timestamp: timestamp(),
    })
}

pub async fn post_command(
    State(bridge): State<SharedBridge>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(request) = payload?;
    let token = request
        .command
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::MalformedRequest("Command is required".to_string()))?;
    let command = LedCommand::parse(&token)?;

    debug!("POST /command {}", command);
    let snapshot = bridge.dispatch(command).await?;

    Ok(Json(CommandResponse {
        success: true,
        command: token,
        led_states: snapshot.led_states,
        timestamp: timestamp(),
    }))
}

pub async fn get_leds(State(bridge): State<SharedBridge>) -> Json<LedsResponse> {
    Json(LedsResponse {
        led_states: bridge.led_states(),
        pins: PINS,
        timestamp: timestamp(),
    })
}

pub async fn post_led(
    State(bridge): State<SharedBridge>,
    Path(pin): Path<String>,
    payload: Result<Json<LedRequest>, JsonRejection>,
) -> Result<Json<LedResponse>, ApiError> {
    let pin = pin
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| Pin::new(n).ok())
        .ok_or_else(|| ApiError::MalformedRequest("Pin must be between 2 and 6".to_string()))?;
    let Json(request) = payload?;

    debug!("POST /led/{} state={}", pin, request.state);
    let snapshot = bridge.set_channel(pin, request.state).await?;

    Ok(Json(LedResponse {
        success: true,
        pin: pin.number(),
        state: request.state,
        led_states: snapshot.led_states,
    }))
}

pub async fn post_reconnect(State(bridge): State<SharedBridge>) -> Json<ReconnectResponse> {
    let success = bridge.reconnect().await;
    let message = if success {
        "LED controller reconnected"
    } else {
        "Failed to reconnect to LED controller"
    };

    Json(ReconnectResponse {
        success,
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use std::io;
    use std::task::{Context, Poll};

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use led_bridge::{BoxedTransport, BridgeConfig, ConnectError, PortOpener};
    use led_detect::CandidatePort;
    use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

    use crate::simulate::simulated_bridge;

    /// Reads like an idle controller, fails every write
    struct Unplugged {
        host: DuplexStream,
        _device: DuplexStream,
    }

    impl AsyncRead for Unplugged {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            std::pin::Pin::new(&mut self.host).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for Unplugged {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: std::pin::Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct UnpluggedOpener;

    impl PortOpener for UnpluggedOpener {
        fn open(&self, _path: &str, _baud_rate: u32) -> Result<BoxedTransport, ConnectError> {
            let (device, host) = tokio::io::duplex(64);
            Ok(Box::new(Unplugged {
                host,
                _device: device,
            }))
        }
    }

    fn config() -> BridgeConfig {
        BridgeConfig {
            settle_delay: Duration::from_millis(30),
            ..Default::default()
        }
    }

    async fn connected() -> SharedBridge {
        let bridge = Arc::new(simulated_bridge(config()));
        assert!(bridge.reconnect().await);
        bridge
    }

    fn disconnected() -> SharedBridge {
        Arc::new(BridgeService::new(
            config(),
            Arc::new(Vec::<CandidatePort>::new()),
            Arc::new(crate::simulate::SimulatedOpener::default()),
        ))
    }

    fn command(token: Option<&str>) -> Result<Json<CommandRequest>, JsonRejection> {
        Ok(Json(CommandRequest {
            command: token.map(str::to_string),
        }))
    }

    fn led(state: bool) -> Result<Json<LedRequest>, JsonRejection> {
        Ok(Json(LedRequest { state }))
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        // 2024-01-01T00:00:00.000Z
        assert_eq!(ts.len(), 24);
    }

    #[test]
    fn test_response_field_names() {
        let json = serde_json::to_value(StatusResponse {
            connected: true,
            led_states: DeviceState::from([true, false, false, false, false]),
            timestamp: "t".to_string(),
        })
        .unwrap();

        assert_eq!(json["connected"], true);
        assert_eq!(
            json["ledStates"],
            serde_json::json!([true, false, false, false, false])
        );
    }

    #[tokio::test]
    async fn test_status_when_disconnected() {
        let Json(status) = get_status(State(disconnected())).await;
        assert!(!status.connected);
        assert_eq!(status.led_states.as_array(), [false; 5]);
    }

    #[tokio::test]
    async fn test_leds_lists_pins() {
        let Json(leds) = get_leds(State(disconnected())).await;
        assert_eq!(leds.pins, [2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let bridge = connected().await;

        let Json(response) = post_command(State(bridge.clone()), command(Some("ON3")))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.command, "ON3");
        assert_eq!(
            response.led_states.as_array(),
            [false, true, false, false, false]
        );

        let Json(response) = post_command(State(bridge.clone()), command(Some("OFF3")))
            .await
            .unwrap();
        assert_eq!(response.led_states.as_array(), [false; 5]);

        bridge.close().await;
    }

    #[tokio::test]
    async fn test_command_required() {
        let bridge = connected().await;

        for token in [None, Some("")] {
            let err = post_command(State(bridge.clone()), command(token))
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }

        bridge.close().await;
    }

    #[tokio::test]
    async fn test_command_with_newline_rejected() {
        let bridge = connected().await;

        let err = post_command(State(bridge.clone()), command(Some("ON3\nALLON")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bridge.led_states().as_array(), [false; 5]);

        bridge.close().await;
    }

    #[tokio::test]
    async fn test_whitespace_command_is_forwarded() {
        let bridge = connected().await;

        let Json(response) = post_command(State(bridge.clone()), command(Some("   ")))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.command, "   ");

        bridge.close().await;
    }

    #[tokio::test]
    async fn test_command_write_failure_is_500() {
        let bridge = Arc::new(BridgeService::new(
            config(),
            Arc::new(vec![CandidatePort::new("COM9", Some("Arduino LLC"))]),
            Arc::new(UnpluggedOpener),
        ));
        assert!(bridge.reconnect().await);

        let err = post_command(State(bridge.clone()), command(Some("ALLON")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("write failed"));

        bridge.close().await;
    }

    #[tokio::test]
    async fn test_command_when_disconnected() {
        let err = post_command(State(disconnected()), command(Some("ALLON")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "LED controller not connected");
    }

    #[tokio::test]
    async fn test_led_out_of_range() {
        let bridge = connected().await;

        for pin in ["7", "1", "-3", "abc"] {
            let err = post_led(State(bridge.clone()), Path(pin.to_string()), led(true))
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(bridge.led_states().as_array(), [false; 5]);

        bridge.close().await;
    }

    #[tokio::test]
    async fn test_led_switches_channel() {
        let bridge = connected().await;

        let Json(response) = post_led(State(bridge.clone()), Path("5".to_string()), led(true))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.pin, 5);
        assert!(response.state);
        assert_eq!(
            response.led_states.as_array(),
            [false, false, false, true, false]
        );

        bridge.close().await;
    }

    #[tokio::test]
    async fn test_led_when_disconnected() {
        let err = post_led(State(disconnected()), Path("4".to_string()), led(true))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_reconnect_messages() {
        let Json(response) = post_reconnect(State(disconnected())).await;
        assert!(!response.success);
        assert_eq!(response.message, "Failed to reconnect to LED controller");

        let bridge = Arc::new(simulated_bridge(config()));
        let Json(response) = post_reconnect(State(bridge.clone())).await;
        assert!(response.success);
        assert_eq!(response.message, "LED controller reconnected");
        assert!(bridge.is_connected());

        bridge.close().await;
    }
}
