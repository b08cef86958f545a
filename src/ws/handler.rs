//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ConnectionId, ControlSlot, Controls, SessionEvent};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{parse_client_msg, ClientMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let outbox = state.hub.register(conn_id, state.config.outbox_capacity);
    let controls: ControlSlot = Arc::new(Mutex::new(Controls::default()));

    let connected = SessionEvent::Connected {
        conn_id,
        controls: controls.clone(),
    };
    if state.events.send(connected).await.is_err() {
        error!(conn_id = %conn_id, "World is not running, closing connection");
        state.hub.unregister(conn_id);
        return;
    }

    run_session(conn_id, socket, outbox, controls, &state).await;

    // Cleanup on disconnect
    state.hub.unregister(conn_id);
    notify_disconnect(&state.events, conn_id).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Tell the world the connection is gone; returns false if the world already stopped
async fn notify_disconnect(events: &mpsc::Sender<SessionEvent>, conn_id: ConnectionId) -> bool {
    match events.send(SessionEvent::Disconnected { conn_id }).await {
        Ok(()) => true,
        Err(_) => {
            debug!(conn_id = %conn_id, "Event channel closed before disconnect");
            false
        }
    }
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: ConnectionId,
    socket: WebSocket,
    mut outbox: mpsc::Receiver<String>,
    controls: ControlSlot,
    state: &AppState,
) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);

    // Spawn writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> control slot / world
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(conn_id = %conn_id, "Rate limited client message");
                    continue;
                }

                match parse_client_msg(&text) {
                    // Controls bypass the event queue: the slot always holds the latest state
                    Ok(ClientMsg::Controls { controls: update }) => {
                        let mut current = controls.lock();
                        match update.apply_to(&current) {
                            Ok(next) => *current = next,
                            Err(e) => {
                                debug!(conn_id = %conn_id, error = %e, "Dropping controls");
                            }
                        }
                    }
                    Ok(msg) => {
                        if state.events.send(SessionEvent::Request { conn_id, msg }).await.is_err() {
                            debug!(conn_id = %conn_id, "Event channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(conn_id = %conn_id, error = %e, "Dropping client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}
