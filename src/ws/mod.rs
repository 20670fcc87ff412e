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

use crate::app::AppState;
use crate::protocol::{ClientMessage, ServerMessage};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Pump one connection: client frames become broker events, the outbox
/// drains onto the socket.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let id = ulid::Ulid::new().to_string();
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut inbox) = mpsc::channel::<ServerMessage>(state.outbound_buffer.max(1));

    if !state.broker.connect(id.clone(), outbox).await {
        tracing::error!(connection = %id, "Broker unavailable, closing socket");
        return;
    }

    loop {
        tokio::select! {
            outbound = inbox.recv() => {
                let Some(msg) = outbound else {
                    // broker dropped our outbox
                    break;
                };
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!("Failed to encode server message: {}", e),
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(connection = %id, "Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if !state.broker.message(id.clone(), client_msg).await {
                                    tracing::error!("Broker unavailable");
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(connection = %id, "Failed to parse client message: {}", e);
                                if let Ok(json) = serde_json::to_string(&ServerMessage::parse_error(&e)) {
                                    if sender.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::debug!(connection = %id, "WebSocket closed by client");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(connection = %id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.broker.disconnect(id).await;
}
