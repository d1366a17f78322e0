use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use plaudit_core::config::{HEARTBEAT_INTERVAL_SECS, MAX_PAYLOAD_BYTES, PROTOCOL_VERSION};
use plaudit_protocol::{
    frames::{EventFrame, Frame},
    names::{CONNECTED, TICK},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::app::AppState;
use crate::ws::{message, send};

/// Observer lifecycle: linear progression, no backwards transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Connecting,
    Connected,
    Disconnected,
}

/// Axum handler: upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_PAYLOAD_BYTES)
        .on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection event loop: lives for the entire WS session.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let mut conn_state = ObserverState::Connecting;
    let (mut tx, mut rx) = socket.split();

    let (observer_id, mut events) = state.hub.register();
    let hello = Frame::from(EventFrame::new(
        CONNECTED,
        serde_json::json!({ "observerId": observer_id, "protocol": PROTOCOL_VERSION }),
    ));
    if send::json(&mut tx, &hello).await.is_ok() {
        conn_state = ObserverState::Connected;
        info!(observer_id = %observer_id, "observer connected");
    }

    let mut tick = tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // the first tick completes immediately
    tick.tick().await;

    while conn_state == ObserverState::Connected {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(res) = message::handle(&observer_id, text.as_str(), &state).await {
                            if send::json(&mut tx, &Frame::from(res)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // includes frames over MAX_PAYLOAD_BYTES, rejected by the codec
                    Some(Err(e)) => {
                        debug!(observer_id = %observer_id, error = %e, "transport error");
                        break;
                    }
                    _ => {}
                }
            }

            event = events.recv() => {
                match event {
                    Some(payload) => {
                        if send::text(&mut tx, payload).await.is_err() {
                            break;
                        }
                    }
                    // the hub pruned us
                    None => break,
                }
            }

            _ = tick.tick() => {
                let ev = Frame::from(EventFrame::new(
                    TICK,
                    serde_json::json!({ "ts": chrono::Utc::now().timestamp_millis() }),
                ));
                if send::json(&mut tx, &ev).await.is_err() {
                    break;
                }
            }
        }
    }

    conn_state = ObserverState::Disconnected;
    state.hub.disconnect(&observer_id);
    info!(observer_id = %observer_id, state = ?conn_state, "observer closed");
}
