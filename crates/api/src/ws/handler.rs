use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use dreamcut_core::types::EntityId;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Inbound subscription control frame.
///
/// Clients send `{"action":"subscribe","query_id":"..."}` (or
/// `"unsubscribe"`) to manage which queries they receive progress
/// frames for.
#[derive(Debug, Deserialize)]
struct ControlFrame {
    action: Action,
    query_id: EntityId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Action {
    Subscribe,
    Unsubscribe,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two spawned tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound control frames on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound control frames.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => match serde_json::from_str::<ControlFrame>(&text) {
                Ok(frame) => match frame.action {
                    Action::Subscribe => {
                        tracing::debug!(conn_id = %conn_id, query_id = %frame.query_id, "Subscribed");
                        ws_manager.subscribe(&conn_id, frame.query_id).await;
                    }
                    Action::Unsubscribe => {
                        tracing::debug!(conn_id = %conn_id, query_id = %frame.query_id, "Unsubscribed");
                        ws_manager.unsubscribe(&conn_id, frame.query_id).await;
                    }
                },
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed control frame");
                }
            },
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_frame_parses_subscribe() {
        let frame: ControlFrame = serde_json::from_str(
            r#"{"action":"subscribe","query_id":"0190a8c0-0000-7000-8000-000000000000"}"#,
        )
        .unwrap();
        assert!(matches!(frame.action, Action::Subscribe));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result = serde_json::from_str::<ControlFrame>(
            r#"{"action":"replay","query_id":"0190a8c0-0000-7000-8000-000000000000"}"#,
        );
        assert!(result.is_err());
    }
}
