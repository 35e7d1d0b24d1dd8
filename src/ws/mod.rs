pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Room code to watch; connections without one only get direct
    /// request/response messages.
    pub room: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: room={:?}", params.room);

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Handle an individual WebSocket connection: answer client messages and,
/// when a room was named at connect time, forward that room's change
/// notifications.
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Watchers get the current snapshot up front, then change pings.
    let mut notifications = match &params.room {
        Some(code) => match state.subscribe(code).await {
            Ok(rx) => {
                match state.get_state(code).await {
                    Ok(snapshot) => {
                        let msg = ServerMessage::room_state(&snapshot);
                        if send_message(&mut sender, &msg).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = send_message(&mut sender, &ServerMessage::from(&err)).await;
                    }
                }
                Some(rx)
            }
            Err(err) => {
                let _ = send_message(&mut sender, &ServerMessage::from(&err)).await;
                return;
            }
        },
        None => None,
    };

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let msg = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket receive error: {e}");
                        break;
                    }
                };

                let response = match serde_json::from_str::<ClientMessage>(&msg) {
                    Ok(client_msg) => handlers::handle_message(client_msg, &state).await,
                    Err(e) => Some(ServerMessage::Error {
                        code: "BAD_MESSAGE".to_string(),
                        msg: format!("could not parse message: {e}"),
                    }),
                };
                if let Some(response) = response {
                    if send_message(&mut sender, &response).await.is_err() {
                        break;
                    }
                }
            }
            notification = recv_notification(&mut notifications) => {
                match notification {
                    Some(msg) => {
                        if send_message(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    // Lagged or closed; the client re-fetches on reconnect.
                    None => break,
                }
            }
        }
    }

    tracing::debug!("WebSocket disconnected");
}

/// Await the next broadcast, or pend forever when this connection watches no
/// room (keeps the select arm uniform).
async fn recv_notification(
    rx: &mut Option<tokio::sync::broadcast::Receiver<ServerMessage>>,
) -> Option<ServerMessage> {
    match rx {
        Some(rx) => rx.recv().await.ok(),
        None => std::future::pending().await,
    }
}

async fn send_message(
    sender: &mut (impl SinkExt<Message> + Unpin),
    msg: &ServerMessage,
) -> Result<(), ()> {
    let text = serde_json::to_string(msg).map_err(|_| ())?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
