//! `WebSocket` handler streaming stale-view notices.
//!
//! Clients connect to `GET /ws/invalidations` and receive a JSON-encoded
//! [`Invalidation`](crate::state::Invalidation) each time an attendance
//! change makes a rendered view out of date. All connected clients share
//! one [`broadcast`](tokio::sync::broadcast) channel.
//!
//! If a client falls behind, lagged messages are silently skipped and
//! the client resumes from the most recent notice.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming invalidation notices.
///
/// # Route
///
/// `GET /ws/invalidations`
pub async fn ws_invalidations(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("Invalidation subscriber connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(notice) => {
                        let json = match serde_json::to_string(&notice) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize invalidation: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("Invalidation subscriber disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Invalidation subscriber lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Invalidation channel closed");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Invalidation subscriber disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Clients have nothing to say on this channel.
                    _ => {}
                }
            }
        }
    }
}
