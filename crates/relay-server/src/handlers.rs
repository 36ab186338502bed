//! Connection handlers for the relay server.
//!
//! This module handles the connection lifecycle and frame processing.

use crate::config::Config;
use crate::metrics::{self, ConnectionGauge, Direction};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use relay_protocol::{codec, Frame};
use std::sync::Arc;
use std::time::Instant;
use tenvis_relay_core::{Disposition, Registry, RegistryConfig, Relay, RelayConfig, Session};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// The relay, shared by every connection.
    pub relay: Relay,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let registry = Registry::with_config(RegistryConfig {
            max_destinations: config.limits.max_destinations,
        });
        let relay_config = RelayConfig {
            max_subscriptions_per_session: config.limits.max_subscriptions_per_session,
            ..RelayConfig::default()
        };

        Self {
            relay: Relay::with_config(Arc::new(registry), relay_config),
            config,
        }
    }
}

/// Build the HTTP router.
pub fn app(state: Arc<AppState>) -> Router {
    let websocket_path = state.config.transport.websocket_path.clone();

    Router::new()
        .route(&websocket_path, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Relay server listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.transport.websocket_path
    );

    serve(listener, Arc::new(AppState::new(config))).await
}

/// Serve the relay on an already bound listener.
///
/// # Errors
///
/// Returns an error if the server stops with an I/O error.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(state.config.limits.max_message_size)
        .on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle a WebSocket connection.
///
/// Inbound frames are processed in arrival order on this task. Outbound
/// frames go through the session's queue to a writer task, so fan-out from
/// other connections never waits on this socket.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let _gauge = ConnectionGauge::open();

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut outbound) = mpsc::unbounded_channel::<Frame>();

    let mut session = state.relay.open_session(tx);
    let connection = session.id();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let text = codec::encode(&frame);
            metrics::record_frame(Direction::Outbound, text.len());
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    while let Some(msg) = receiver.next().await {
        let data = match msg {
            Ok(Message::Text(text)) => BytesMut::from(text.as_bytes()),
            Ok(Message::Binary(data)) => BytesMut::from(&data[..]),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                debug!(connection = %connection, "Received close frame");
                break;
            }
            Err(e) => {
                warn!(connection = %connection, error = %e, "WebSocket error");
                metrics::record_error("websocket");
                break;
            }
        };

        let started = Instant::now();
        let disconnected = process_message(&state, &mut session, data);
        metrics::record_processing(started.elapsed());

        if disconnected {
            break;
        }
    }

    // Unregister first so no new MESSAGE frames are queued behind the close.
    state.relay.close_session(&mut session);
    metrics::record_registry(&state.relay.registry().stats());
    drop(session);
    drop(writer);

    debug!(connection = %connection, "WebSocket disconnected");
}

/// Decode and dispatch every frame in one WebSocket message.
///
/// Returns `true` once the session has processed DISCONNECT.
fn process_message(state: &AppState, session: &mut Session, mut buf: BytesMut) -> bool {
    loop {
        let before = buf.len();
        let frame = match codec::decode_eof(&mut buf) {
            Ok(Some(frame)) => frame,
            Ok(None) => return false,
            Err(e) => {
                warn!(connection = %session.id(), error = %e, "Failed to decode frame");
                metrics::record_error("decode");
                continue;
            }
        };
        metrics::record_frame(Direction::Inbound, before - buf.len());

        let result = state.relay.handle_frame(session, frame);
        metrics::record_disposition(result.as_ref().ok());
        match result {
            Ok(Disposition::Disconnected) => return true,
            Ok(Disposition::Subscribed | Disposition::Unsubscribed) => {
                metrics::record_registry(&state.relay.registry().stats());
            }
            Ok(_) => {}
            Err(e) => {
                debug!(connection = %session.id(), reason = %e, "Dropped frame");
            }
        }
    }
}
