//! Realtime channel. A client authenticates the connection once with a
//! bearer credential, then joins/leaves pull-request rooms; all state change
//! fanout arrives as `ServerEvent` frames.

use api_types::{ClientEvent, ServerEvent, User};
use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::unbounded_channel;
use uuid::Uuid;

use crate::{AppState, auth, error::ErrorResponse, rooms::pr_room};

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

pub async fn ws(
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ErrorResponse> {
    let user = auth::authenticate(&state, &query.token).await?;
    Ok(upgrade.on_upgrade(move |socket| handle_socket(state, user, socket)))
}

async fn handle_socket(state: AppState, user: User, socket: WebSocket) {
    let connection = Uuid::new_v4();
    tracing::debug!(%connection, user_id = %user.id, "realtime connection opened");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = unbounded_channel::<String>();

    // Outbound pump: everything the registry (or this task) sends to `tx`
    // goes out on the socket.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of the
            // protocol.
            _ => continue,
        };

        match serde_json::from_str::<ClientEvent>(&text) {
            Ok(ClientEvent::JoinPr {
                project_id,
                pr_number,
            }) => {
                let room = pr_room(project_id, pr_number);
                let client_count = state.rooms().join(connection, tx.clone(), &room);
                let joined = ServerEvent::RoomJoined { room, client_count };
                if let Ok(frame) = serde_json::to_string(&joined) {
                    let _ = tx.send(frame);
                }
            }
            Ok(ClientEvent::LeavePr {
                project_id,
                pr_number,
            }) => {
                state
                    .rooms()
                    .leave(connection, &pr_room(project_id, pr_number));
            }
            Err(error) => {
                tracing::debug!(%connection, ?error, "ignoring malformed client event");
            }
        }
    }

    // Room membership is session state: drop it with the connection, without
    // any broadcast.
    state.rooms().disconnect(connection);
    send_task.abort();
    tracing::debug!(%connection, user_id = %user.id, "realtime connection closed");
}
