//! QQ gateway WebSocket payloads: `{ "op", "d", "s", "t" }`.

use crate::channels::inbound::InboundMessage;
use serde::{Deserialize, Serialize};

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_IDENTIFY: u8 = 2;
pub const OP_RECONNECT: u8 = 7;
pub const OP_INVALID_SESSION: u8 = 9;
pub const OP_HELLO: u8 = 10;
pub const OP_HEARTBEAT_ACK: u8 = 11;

/// Intent bit for @-mention messages in public guild channels.
pub const INTENT_PUBLIC_GUILD_MESSAGES: u32 = 1 << 30;

pub const EVENT_READY: &str = "READY";
pub const EVENT_AT_MESSAGE_CREATE: &str = "AT_MESSAGE_CREATE";

/// Wire frame. `s` and `t` are only set on dispatches (op 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsPayload {
    pub op: u8,
    #[serde(default)]
    pub d: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelloData {
    /// Milliseconds between heartbeats.
    pub heartbeat_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadyData {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub user: Option<BotUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// `AT_MESSAGE_CREATE` body (only the fields the bot reads).
#[derive(Debug, Clone, Deserialize)]
pub struct AtMessageData {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<BotUser>,
}

impl From<AtMessageData> for InboundMessage {
    fn from(m: AtMessageData) -> Self {
        InboundMessage {
            id: m.id,
            channel_id: m.channel_id,
            content: m.content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct IdentifyData<'a> {
    token: &'a str,
    intents: u32,
    shard: [u32; 2],
    properties: serde_json::Value,
}

/// op 2 with the bot token and subscribed intents; single shard.
pub fn identify(token: &str, intents: u32) -> WsPayload {
    let d = IdentifyData {
        token,
        intents,
        shard: [0, 1],
        properties: serde_json::json!({}),
    };
    WsPayload {
        op: OP_IDENTIFY,
        d: serde_json::to_value(d).unwrap_or_default(),
        s: None,
        t: None,
    }
}

/// op 1 carrying the last dispatch sequence seen (null before the first).
pub fn heartbeat(last_seq: Option<u64>) -> WsPayload {
    WsPayload {
        op: OP_HEARTBEAT,
        d: last_seq.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null),
        s: None,
        t: None,
    }
}
