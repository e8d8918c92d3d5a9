//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.
//! Every connection gets a snapshot on connect and another after each
//! dashboard event.

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
use tokio::sync::broadcast::error::RecvError;

use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;
use crate::dashboard::DashboardEvent;

type Sender = SplitSink<WebSocket, Message>;

/// What to do after reading one client frame
enum Action {
    Reply(ServerMessage),
    Snapshot,
    Close,
    None,
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let hub = Arc::clone(&state.ws_hub);

    let connection_id = match hub.register().await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            let error_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            send(&mut sender, &error_msg).await;
            return;
        }
    };

    // Subscribe before the first snapshot so no event falls in between
    let mut events = state.controller.subscribe_events();

    let connected = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    if !send(&mut sender, &connected).await || !send_snapshot(&mut sender, &state, None).await {
        tracing::debug!(connection_id = %connection_id, "Failed to send initial messages");
        hub.unregister(&connection_id).await;
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let cause = match event {
                    Ok(event) => Some(event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(connection_id = %connection_id, skipped, "Dashboard events lagged");
                        None
                    }
                    Err(RecvError::Closed) => break,
                };
                if !send_snapshot(&mut sender, &state, cause).await {
                    break;
                }
            }
            incoming = receiver.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                        break;
                    }
                    None => break,
                };

                let sent = match handle_ws_message(&connection_id, message) {
                    Action::Reply(reply) => send(&mut sender, &reply).await,
                    Action::Snapshot => send_snapshot(&mut sender, &state, None).await,
                    Action::Close => break,
                    Action::None => true,
                };
                if !sent {
                    break;
                }
            }
        }
    }

    hub.unregister(&connection_id).await;
}

/// Serialize and send; false once the socket is gone
async fn send(sender: &mut Sender, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => sender.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            true
        }
    }
}

async fn send_snapshot(sender: &mut Sender, state: &AppState, cause: Option<DashboardEvent>) -> bool {
    let message = ServerMessage::Snapshot {
        cause,
        dashboard: state.controller.snapshot().await,
    };
    send(sender, &message).await
}

fn handle_ws_message(connection_id: &str, message: Message) -> Action {
    match message {
        Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Ping) => Action::Reply(ServerMessage::Pong),
            Ok(ClientMessage::Snapshot) => Action::Snapshot,
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %e,
                    text = %text,
                    "Invalid client message"
                );
                // Keep the connection open
                Action::Reply(ServerMessage::Error {
                    message: format!("Invalid message format: {}", e),
                })
            }
        },
        Message::Binary(_) => Action::Reply(ServerMessage::Error {
            message: "Binary messages not supported".to_string(),
        }),
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => Action::None,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            Action::Close
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{build_router, ApiConfig};
    use crate::dashboard::{ControllerConfig, DashboardController};
    use serde_json::Value;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    async fn spawn_server() -> (String, AppState) {
        let controller = DashboardController::new(None, ControllerConfig::default());
        controller.mount().await;
        let state = AppState::new(controller, ApiConfig::default());
        let app = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("ws://{}/ws", addr), state)
    }

    async fn next_json<S>(stream: &mut S) -> Value
    where
        S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), stream.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let WsMessage::Text(text) = message {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_snapshot_on_connect_and_on_change() {
        let (url, state) = spawn_server().await;
        let (mut socket, _) = connect_async(url.as_str()).await.unwrap();

        let connected = next_json(&mut socket).await;
        assert_eq!(connected["type"], "connected");

        let initial = next_json(&mut socket).await;
        assert_eq!(initial["type"], "snapshot");
        assert_eq!(initial["dashboard"]["modal_open"], false);
        assert!(initial.get("cause").is_none());
        assert_eq!(state.ws_connection_count().await, 1);

        state.controller.open_modal().await;
        let pushed = next_json(&mut socket).await;
        assert_eq!(pushed["type"], "snapshot");
        assert_eq!(pushed["cause"]["type"], "state_changed");
        assert_eq!(pushed["dashboard"]["modal_open"], true);
    }

    #[tokio::test]
    async fn test_ping_pong_and_bad_messages() {
        let (url, _state) = spawn_server().await;
        let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
        next_json(&mut socket).await;
        next_json(&mut socket).await;

        socket.send(WsMessage::Text(r#"{"type":"ping"}"#.into())).await.unwrap();
        assert_eq!(next_json(&mut socket).await["type"], "pong");

        socket.send(WsMessage::Text("not json".into())).await.unwrap();
        let error = next_json(&mut socket).await;
        assert_eq!(error["type"], "error");

        // Still open after an invalid frame
        socket.send(WsMessage::Text(r#"{"type":"snapshot"}"#.into())).await.unwrap();
        assert_eq!(next_json(&mut socket).await["type"], "snapshot");
    }
}
