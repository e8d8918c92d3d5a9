//! Realtime wire protocol
//!
//! The hosted realtime service speaks Phoenix channels over JSON text frames:
//! `{"topic", "event", "payload", "ref"}`. Only what the lead feed needs is
//! modelled: join, heartbeat, leave, replies and row-change events.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{ChangeEvent, ChangeKind, Lead, LeadId};

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

const PHOENIX_TOPIC: &str = "phoenix";
const PROTOCOL_VERSION: &str = "1.0.0";

/// A single Phoenix frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
}

/// What an inbound frame means for the feed
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A row changed
    Change(ChangeEvent),
    /// Reply to a message we sent
    Reply {
        msg_ref: Option<String>,
        ok: bool,
        detail: String,
    },
    /// Server closed or errored the channel
    ChannelClosed(String),
    /// Presence, system messages and anything else
    Ignored,
}

/// Monotonic message reference generator
#[derive(Debug, Default)]
pub struct RefCounter(u64);

impl RefCounter {
    pub fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

/// Channel topic for a table
pub fn channel_topic(schema: &str, table: &str) -> String {
    format!("realtime:{}:{}", schema, table)
}

/// WebSocket endpoint derived from the project URL
///
/// `https://x.supabase.co` becomes
/// `wss://x.supabase.co/realtime/v1/websocket?apikey=<key>&vsn=1.0.0`.
pub fn realtime_url(base_url: &str, anon_key: &str) -> StoreResult<String> {
    let base = base_url.trim_end_matches('/');
    let socket_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("wss://") || base.starts_with("ws://") {
        base.to_string()
    } else {
        return Err(StoreError::Realtime(format!(
            "Unsupported store URL scheme: {}",
            base_url
        )));
    };

    Ok(format!(
        "{}/realtime/v1/websocket?apikey={}&vsn={}",
        socket_base,
        urlencoding::encode(anon_key),
        PROTOCOL_VERSION
    ))
}

/// Join frame subscribing to every change on one table
pub fn join(topic: &str, schema: &str, table: &str, access_token: &str, msg_ref: String) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_string(),
        event: EVENT_JOIN.to_string(),
        payload: json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": schema, "table": table }
                ]
            },
            "access_token": access_token
        }),
        msg_ref: Some(msg_ref),
    }
}

pub fn heartbeat(msg_ref: String) -> PhoenixMessage {
    PhoenixMessage {
        topic: PHOENIX_TOPIC.to_string(),
        event: EVENT_HEARTBEAT.to_string(),
        payload: json!({}),
        msg_ref: Some(msg_ref),
    }
}

pub fn leave(topic: &str, msg_ref: String) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_string(),
        event: EVENT_LEAVE.to_string(),
        payload: json!({}),
        msg_ref: Some(msg_ref),
    }
}

/// Classify an inbound frame addressed to `topic`
pub fn decode(message: &PhoenixMessage, topic: &str) -> Inbound {
    // Heartbeat replies arrive on the "phoenix" topic
    if message.topic != topic && message.topic != PHOENIX_TOPIC {
        return Inbound::Ignored;
    }

    match message.event.as_str() {
        EVENT_REPLY => {
            let status = message.payload.get("status").and_then(Value::as_str);
            let detail = message
                .payload
                .get("response")
                .map(|r| r.to_string())
                .unwrap_or_default();
            Inbound::Reply {
                msg_ref: message.msg_ref.clone(),
                ok: status == Some("ok"),
                detail,
            }
        }
        EVENT_POSTGRES_CHANGES => match message.payload.get("data") {
            Some(data) => Inbound::Change(change_from_data(data)),
            None => Inbound::Change(ChangeEvent::unknown()),
        },
        // Older servers send the change type as the event name
        "INSERT" | "UPDATE" | "DELETE" => Inbound::Change(change_from_data(&message.payload)),
        EVENT_CLOSE | EVENT_ERROR => Inbound::ChannelClosed(message.event.clone()),
        _ => Inbound::Ignored,
    }
}

fn change_from_data(data: &Value) -> ChangeEvent {
    let kind = match data.get("type").and_then(Value::as_str) {
        Some("INSERT") => ChangeKind::Insert,
        Some("UPDATE") => ChangeKind::Update,
        Some("DELETE") => ChangeKind::Delete,
        _ => ChangeKind::Unknown,
    };

    let record = data
        .get("record")
        .filter(|r| r.as_object().is_some_and(|o| !o.is_empty()))
        .and_then(|r| match serde_json::from_value::<Lead>(r.clone()) {
            Ok(lead) => Some(lead),
            Err(e) => {
                tracing::debug!(error = %e, "Change record did not decode as a lead");
                None
            }
        });

    let old_id = data
        .get("old_record")
        .and_then(|r| r.get("id"))
        .and_then(|id| serde_json::from_value::<LeadId>(id.clone()).ok())
        .or_else(|| record.as_ref().map(|l| l.id.clone()).filter(|_| kind == ChangeKind::Update));

    ChangeEvent { kind, record, old_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::Stage;

    const TOPIC: &str = "realtime:public:leads";

    fn frame(json: &str) -> PhoenixMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_realtime_url() {
        assert_eq!(
            realtime_url("https://abc.supabase.co/", "key").unwrap(),
            "wss://abc.supabase.co/realtime/v1/websocket?apikey=key&vsn=1.0.0"
        );
        assert_eq!(
            realtime_url("http://127.0.0.1:54321", "k y").unwrap(),
            "ws://127.0.0.1:54321/realtime/v1/websocket?apikey=k%20y&vsn=1.0.0"
        );
        assert!(realtime_url("ftp://nope", "key").is_err());
    }

    #[test]
    fn test_join_frame() {
        let msg = join(TOPIC, "public", "leads", "key", "1".to_string());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "phx_join");
        assert_eq!(json["ref"], "1");
        assert_eq!(json["payload"]["config"]["postgres_changes"][0]["event"], "*");
        assert_eq!(json["payload"]["config"]["postgres_changes"][0]["table"], "leads");
    }

    #[test]
    fn test_heartbeat_and_leave() {
        let mut refs = RefCounter::default();
        let hb = heartbeat(refs.next());
        assert_eq!(hb.topic, "phoenix");
        assert_eq!(hb.msg_ref.as_deref(), Some("1"));

        let bye = leave(TOPIC, refs.next());
        assert_eq!(bye.event, "phx_leave");
        assert_eq!(bye.msg_ref.as_deref(), Some("2"));
    }

    #[test]
    fn test_decode_join_reply() {
        let ok = frame(r#"{"topic":"realtime:public:leads","event":"phx_reply","payload":{"status":"ok","response":{}},"ref":"1"}"#);
        assert!(matches!(decode(&ok, TOPIC), Inbound::Reply { ok: true, .. }));

        let refused = frame(r#"{"topic":"realtime:public:leads","event":"phx_reply","payload":{"status":"error","response":{"reason":"unauthorized"}},"ref":"1"}"#);
        match decode(&refused, TOPIC) {
            Inbound::Reply { ok, detail, .. } => {
                assert!(!ok);
                assert!(detail.contains("unauthorized"));
            }
            other => panic!("Expected Reply, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_insert_change() {
        let msg = frame(
            r#"{"topic":"realtime:public:leads","event":"postgres_changes","ref":null,
                "payload":{"ids":[1],"data":{"type":"INSERT","schema":"public","table":"leads",
                "commit_timestamp":"2024-03-01T00:00:00Z",
                "record":{"id":3,"name":"Acme","value":1000,"vendor":"Vendedor 1","stage":"contato",
                          "last_update":null,"created_at":"2024-03-01T00:00:00+00:00"},
                "old_record":{}}}}"#,
        );
        match decode(&msg, TOPIC) {
            Inbound::Change(event) => {
                assert_eq!(event.kind, ChangeKind::Insert);
                let record = event.record.unwrap();
                assert_eq!(record.name, "Acme");
                assert_eq!(record.stage, Stage::Contact);
                assert!(event.old_id.is_none());
            }
            other => panic!("Expected Change, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_update_with_null_columns() {
        let msg = frame(
            r#"{"topic":"realtime:public:leads","event":"postgres_changes",
                "payload":{"data":{"type":"UPDATE",
                "record":{"id":4,"name":"Beta","value":null,"vendor":null,"stage":"proposta",
                          "last_update":null,"created_at":"2024-03-01T00:00:00+00:00"},
                "old_record":{"id":4}}}}"#,
        );
        match decode(&msg, TOPIC) {
            Inbound::Change(event) => {
                let record = event.record.unwrap();
                assert_eq!(record.value, 0.0);
                assert_eq!(record.stage, Stage::Proposal);
                assert_eq!(event.old_id, Some(LeadId::Number(4)));
            }
            other => panic!("Expected Change, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_delete_change() {
        let msg = frame(
            r#"{"topic":"realtime:public:leads","event":"postgres_changes",
                "payload":{"data":{"type":"DELETE","record":null,"old_record":{"id":9}}}}"#,
        );
        match decode(&msg, TOPIC) {
            Inbound::Change(event) => {
                assert_eq!(event.kind, ChangeKind::Delete);
                assert!(event.record.is_none());
                assert_eq!(event.old_id, Some(LeadId::Number(9)));
            }
            other => panic!("Expected Change, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_legacy_event_name() {
        let msg = frame(
            r#"{"topic":"realtime:public:leads","event":"UPDATE",
                "payload":{"type":"UPDATE","record":{"id":"x"}}}"#,
        );
        match decode(&msg, TOPIC) {
            // Partial record doesn't decode, but the change still counts
            Inbound::Change(event) => {
                assert_eq!(event.kind, ChangeKind::Update);
                assert!(event.record.is_none());
            }
            other => panic!("Expected Change, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_other_topics_ignored() {
        let msg = frame(r#"{"topic":"realtime:public:other","event":"postgres_changes","payload":{}}"#);
        assert_eq!(decode(&msg, TOPIC), Inbound::Ignored);

        let presence = frame(r#"{"topic":"realtime:public:leads","event":"presence_state","payload":{}}"#);
        assert_eq!(decode(&presence, TOPIC), Inbound::Ignored);
    }
}
