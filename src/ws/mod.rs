pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::protocol::ClientMessage;
use crate::state::{AppState, ConnHandle};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection for its whole lifetime.
///
/// The connection starts anonymous; it becomes the host or an audience
/// member through the first join message it sends. All outbound traffic is
/// queued on an unbounded channel so state handlers never block on a slow
/// socket.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = state.next_conn_id();
    let (tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let conn = ConnHandle::new(conn_id, tx);

    tracing::info!("WebSocket connected: {:?}", conn_id);

    loop {
        tokio::select! {
            // Drain queued server messages into the socket
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        let closing = matches!(msg, Message::Close(_));
                        if sender.send(msg).await.is_err() || closing {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(&state, &conn, client_msg).await;
                            }
                            Err(e) => {
                                // Malformed frames are dropped without a reply
                                tracing::error!("Failed to parse client message: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed: {:?}", conn_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.handle_disconnect(conn_id).await;
    tracing::info!("WebSocket disconnected: {:?}", conn_id);
}
