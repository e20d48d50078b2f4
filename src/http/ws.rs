//! WebSocket endpoint for poll rooms
//!
//! Each socket is registered with [`PollRooms`] on upgrade. Two tasks run per
//! socket: one forwards queued [`ServerEvent`]s to the client, the other applies
//! `joinPoll` / `leavePoll` frames. When either ends the other is aborted and
//! the connection is removed from every room.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, warn};

use crate::Result;
use crate::broadcast::{ClientEvent, ConnectionId, PollRooms, ServerEvent};
use crate::http::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.rooms))
}

async fn handle_socket(socket: WebSocket, rooms: Arc<PollRooms>) {
    let (connection_id, mut events) = match rooms.connect() {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to register connection: {e}");
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let frame = match encode_event(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Failed to encode event: {e}");
                    continue;
                }
            };

            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_rooms = rooms.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    if let Err(e) = apply_client_frame(&recv_rooms, connection_id, text.as_str()) {
                        warn!(%connection_id, "Ignoring client frame: {e}");
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    if let Err(e) = rooms.disconnect(connection_id) {
        error!(%connection_id, "Failed to clean up connection: {e}");
    }
    debug!(%connection_id, "Socket closed");
}

fn encode_event(event: &ServerEvent) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

/// Parse one client frame and apply it to the room registry
pub(crate) fn apply_client_frame(
    rooms: &PollRooms,
    connection_id: ConnectionId,
    frame: &str,
) -> Result<()> {
    match serde_json::from_str::<ClientEvent>(frame)? {
        ClientEvent::JoinPoll(poll_id) => {
            rooms.subscribe(connection_id, &poll_id)?;
        }
        ClientEvent::LeavePoll(poll_id) => {
            rooms.unsubscribe(connection_id, &poll_id)?;
        }
    }
    Ok(())
}
