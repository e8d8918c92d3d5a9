//! Realtime change channel
//!
//! Opens the realtime WebSocket, joins the table's channel and runs the feed
//! task: forwards row changes to the callback, keeps the socket alive with
//! heartbeats, and leaves the channel when the subscription is released.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::protocol::{self, Inbound, PhoenixMessage, RefCounter};
use super::SupabaseConfig;
use crate::store::error::{StoreError, StoreResult};
use crate::store::gateway::{ChangeCallback, SubscriptionHandle};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for the server to acknowledge the join
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect, join and spawn the feed task
pub async fn open(config: &SupabaseConfig, on_change: ChangeCallback) -> StoreResult<SubscriptionHandle> {
    let url = protocol::realtime_url(&config.url, &config.anon_key)?;
    let topic = protocol::channel_topic(&config.schema, &config.table);

    let (mut socket, _) = connect_async(url.as_str()).await?;
    let mut refs = RefCounter::default();

    let join_ref = refs.next();
    send(
        &mut socket,
        &protocol::join(&topic, &config.schema, &config.table, &config.anon_key, join_ref.clone()),
    )
    .await?;

    match tokio::time::timeout(JOIN_TIMEOUT, await_reply(&mut socket, &topic, &join_ref)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let _ = socket.close(None).await;
            return Err(e);
        }
        Err(_) => {
            let _ = socket.close(None).await;
            return Err(StoreError::Realtime("Timed out joining change channel".to_string()));
        }
    }

    tracing::info!(topic = %topic, "Joined realtime change channel");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let heartbeat = Duration::from_secs(config.heartbeat_interval_secs.max(1));
    let task = tokio::spawn(run_feed(socket, topic, refs, heartbeat, on_change, shutdown_rx));

    Ok(SubscriptionHandle::new(shutdown_tx, task))
}

async fn send(socket: &mut Socket, message: &PhoenixMessage) -> StoreResult<()> {
    let text = serde_json::to_string(message)?;
    socket.send(Message::Text(text.into())).await?;
    Ok(())
}

fn parse_frame(message: &Message) -> Option<PhoenixMessage> {
    match message {
        Message::Text(text) => match serde_json::from_str::<PhoenixMessage>(text.as_str()) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed realtime frame");
                None
            }
        },
        _ => None,
    }
}

/// Read frames until the reply for `msg_ref` arrives
async fn await_reply(socket: &mut Socket, topic: &str, msg_ref: &str) -> StoreResult<()> {
    while let Some(message) = socket.next().await {
        let message = message?;
        if let Message::Close(_) = message {
            return Err(StoreError::Closed);
        }

        let Some(frame) = parse_frame(&message) else {
            continue;
        };

        if let Inbound::Reply { msg_ref: Some(r), ok, detail } = protocol::decode(&frame, topic) {
            if r == msg_ref {
                return if ok {
                    Ok(())
                } else {
                    Err(StoreError::Realtime(format!("Join refused: {}", detail)))
                };
            }
        }
    }

    Err(StoreError::Closed)
}

async fn run_feed(
    mut socket: Socket,
    topic: String,
    mut refs: RefCounter,
    heartbeat: Duration,
    on_change: ChangeCallback,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + heartbeat, heartbeat);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let leave = protocol::leave(&topic, refs.next());
                if let Err(e) = send(&mut socket, &leave).await {
                    tracing::debug!(error = %e, "Failed to send leave frame");
                }
                let _ = socket.close(None).await;
                tracing::info!(topic = %topic, "Left realtime change channel");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = send(&mut socket, &protocol::heartbeat(refs.next())).await {
                    tracing::warn!(error = %e, "Realtime heartbeat failed, change feed stopped");
                    break;
                }
            }
            message = socket.next() => match message {
                Some(Ok(Message::Close(frame))) => {
                    tracing::warn!(?frame, "Realtime socket closed by server, change feed stopped");
                    break;
                }
                Some(Ok(message)) => {
                    let Some(frame) = parse_frame(&message) else { continue };
                    match protocol::decode(&frame, &topic) {
                        Inbound::Change(event) => {
                            tracing::debug!(kind = ?event.kind, "Lead table changed");
                            on_change(event);
                        }
                        Inbound::Reply { ok: false, detail, .. } => {
                            tracing::warn!(detail = %detail, "Realtime request rejected");
                        }
                        Inbound::ChannelClosed(reason) => {
                            tracing::warn!(reason = %reason, "Realtime channel closed, change feed stopped");
                            break;
                        }
                        Inbound::Reply { .. } | Inbound::Ignored => {}
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Realtime socket error, change feed stopped");
                    break;
                }
                None => {
                    tracing::warn!("Realtime socket ended, change feed stopped");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{ChangeEvent, ChangeKind};
    use axum::extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade};
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// What the fake server saw from the client
    #[derive(Debug)]
    enum Seen {
        Joined(serde_json::Value),
        Left,
    }

    async fn fake_realtime(mut socket: WebSocket, seen: mpsc::UnboundedSender<Seen>, accept: bool) {
        while let Some(Ok(AxumMessage::Text(text))) = socket.recv().await {
            let frame: PhoenixMessage = serde_json::from_str(&text).unwrap();
            match frame.event.as_str() {
                "phx_join" => {
                    let _ = seen.send(Seen::Joined(frame.payload.clone()));
                    let status = if accept { "ok" } else { "error" };
                    let reply = json!({
                        "topic": frame.topic,
                        "event": "phx_reply",
                        "payload": {"status": status, "response": {}},
                        "ref": frame.msg_ref,
                    });
                    socket.send(AxumMessage::Text(reply.to_string())).await.unwrap();
                    if !accept {
                        continue;
                    }

                    let change = json!({
                        "topic": frame.topic,
                        "event": "postgres_changes",
                        "payload": {"data": {
                            "type": "INSERT",
                            "record": {
                                "id": 1, "name": "Acme", "value": 1000,
                                "vendor": "Vendedor 1", "stage": "contato",
                                "last_update": null,
                                "created_at": "2024-03-01T00:00:00+00:00"
                            },
                            "old_record": {}
                        }},
                        "ref": null,
                    });
                    socket.send(AxumMessage::Text(change.to_string())).await.unwrap();
                }
                "phx_leave" => {
                    let _ = seen.send(Seen::Left);
                }
                _ => {}
            }
        }
    }

    async fn spawn_server(accept: bool) -> (String, mpsc::UnboundedReceiver<Seen>) {
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/realtime/v1/websocket",
            get(move |ws: WebSocketUpgrade| {
                let seen = seen_tx.clone();
                async move { ws.on_upgrade(move |socket| fake_realtime(socket, seen, accept)) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), seen_rx)
    }

    #[tokio::test]
    async fn test_feed_delivers_changes_and_leaves() {
        let (url, mut seen) = spawn_server(true).await;
        let config = SupabaseConfig::new(url, "anon-key");

        let (tx, mut changes) = mpsc::unbounded_channel();
        let handle = open(&config, Arc::new(move |event: ChangeEvent| {
            let _ = tx.send(event);
        }))
        .await
        .unwrap();

        match seen.recv().await.unwrap() {
            Seen::Joined(payload) => {
                assert_eq!(payload["access_token"], "anon-key");
                assert_eq!(payload["config"]["postgres_changes"][0]["table"], "leads");
            }
            other => panic!("Expected join, got {other:?}"),
        }

        let event = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.record.unwrap().name, "Acme");

        handle.unsubscribe().await;

        let left = tokio::time::timeout(Duration::from_secs(5), seen.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(left, Seen::Left));
        // Feed task ended, so the callback was dropped
        assert!(changes.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_refused_join_is_an_error() {
        let (url, _seen) = spawn_server(false).await;
        let config = SupabaseConfig::new(url, "bad-key");

        let result = open(&config, Arc::new(|_: ChangeEvent| {})).await;
        assert!(matches!(result, Err(StoreError::Realtime(_))));
    }
}
