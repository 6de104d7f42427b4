use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::models::ServerEvent;
use crate::state::AppState;
use crate::websocket::handle_text_frame;
use crate::ws::{connctx::ConnCtx, lifecycle};

/// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection: a writer task drains the outbound queue and sends
/// heartbeats, while this task reads and handles frames in arrival order.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let _slot = state.track_connection();
    let (tx, rx) = mpsc::channel::<ServerEvent>(state.config.outbound_buffer.max(1));
    let mut conn = ConnCtx::new(tx);
    info!("WebSocket connection established: {}", conn.conn_id);

    let (sender, mut receiver) = socket.split();
    let mut writer = tokio::spawn(write_outbound(sender, rx, state.config.heartbeat_interval()));

    let idle_timeout = state.config.heartbeat_timeout();
    loop {
        let frame = tokio::select! {
            // The writer only stops once the client is unreachable.
            _ = &mut writer => {
                debug!("Writer for connection {} stopped", conn.conn_id);
                break;
            }
            next = timeout(idle_timeout, receiver.next()) => next,
        };

        let msg = match frame {
            Err(_) => {
                warn!(
                    "Connection {} silent for {}s, closing",
                    conn.conn_id,
                    idle_timeout.as_secs()
                );
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                warn!("WebSocket error on connection {}: {}", conn.conn_id, e);
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        match msg {
            Message::Text(text) => handle_text_frame(&state, &mut conn, &text).await,
            Message::Close(_) => break,
            // Pings are answered by axum; any frame counts as liveness.
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    lifecycle::disconnect(&state, &mut conn).await;
    drop(conn);
    writer.abort();
    info!("WebSocket connection terminated");
}

async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ServerEvent>,
    heartbeat_every: Duration,
) {
    let mut heartbeat = interval(heartbeat_every);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize '{}' event: {}", event.type_name(), e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sender.close().await;
}
