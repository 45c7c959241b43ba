//! WebSocket notification stream.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use std::sync::atomic::Ordering;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, instrument, warn};

use crate::app_state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/stream",
    responses(
        (status = 101, description = "WebSocket upgrade; each message is {\"event\": name, \"payload\": {...}}")
    ),
    tag = "Streaming"
)]
/// WebSocket endpoint for watcher notifications.
#[instrument(skip(state, ws))]
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("WebSocket connection requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut rx = state.notifications.subscribe();
    let clients = state.stream_clients.fetch_add(1, Ordering::Relaxed) + 1;
    info!(clients, "WebSocket connection established");

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(notification) => {
                    let Ok(json) = serde_json::to_string(&notification) else {
                        continue;
                    };
                    if socket.send(Message::Text(json)).await.is_err() {
                        warn!("Failed to send notification, closing connection");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Stream client lagging, notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },

            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client closed connection");
                    break;
                }
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    state.stream_clients.fetch_sub(1, Ordering::Relaxed);
    info!("WebSocket connection closed");
}
