use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::broadcaster::MatchBroadcaster;
use super::events::ClientMessage;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster.clone()))
}

async fn handle_socket(socket: WebSocket, broadcaster: Arc<MatchBroadcaster>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn_id = broadcaster.register(tx).await;

    let (mut sender, mut receiver) = socket.split();

    // outbound: registry events → socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Failed to serialize '{}' event: {}", event.name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // inbound: subscription messages from the client
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::SubscribeAll) => broadcaster.subscribe_all(conn_id).await,
                Ok(ClientMessage::SubscribeMatch { match_id }) => {
                    broadcaster.subscribe_match(conn_id, &match_id).await
                }
                Ok(ClientMessage::UnsubscribeMatch { match_id }) => {
                    broadcaster.unsubscribe_match(conn_id, &match_id).await
                }
                Err(_) => {
                    tracing::warn!("Client {} sent an unrecognized message: {}", conn_id, text)
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {} // ping/pong handled by the protocol layer
        }
    }

    broadcaster.disconnect(conn_id).await;
    send_task.abort();
}
