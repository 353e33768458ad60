//! Gateway session loop: connect, identify, heartbeat, and forward @-messages.
//!
//! No resume: after a disconnect the loop waits briefly and identifies again.

use crate::channels::inbound::InboundMessage;
use crate::channels::qq::payload::{
    self, AtMessageData, HelloData, ReadyData, WsPayload, EVENT_AT_MESSAGE_CREATE, EVENT_READY,
    INTENT_PUBLIC_GUILD_MESSAGES, OP_DISPATCH, OP_HEARTBEAT_ACK, OP_HELLO, OP_INVALID_SESSION,
    OP_RECONNECT,
};
use crate::channels::qq::QqChannel;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Why a single connection ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Stopped,
    Reconnect,
    InboundClosed,
}

pub(crate) async fn run_session_loop(
    channel: Arc<QqChannel>,
    inbound_tx: mpsc::Sender<InboundMessage>,
) {
    while channel.running() {
        match run_session(&channel, &inbound_tx).await {
            Ok(SessionEnd::Stopped) => break,
            Ok(SessionEnd::InboundClosed) => {
                log::debug!("qq: inbound channel closed, stopping loop");
                return;
            }
            Ok(SessionEnd::Reconnect) => log::info!("qq gateway asked to reconnect"),
            Err(e) => log::warn!("qq gateway session error: {}", e),
        }
        if !channel.running() {
            break;
        }
        tokio::select! {
            _ = channel.stop_requested() => break,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
    log::info!("qq channel: gateway session loop stopped");
}

async fn run_session(
    channel: &QqChannel,
    inbound_tx: &mpsc::Sender<InboundMessage>,
) -> Result<SessionEnd, String> {
    let url = channel.api().gateway().await.map_err(|e| e.to_string())?;
    log::debug!("qq: connecting to gateway {}", url);
    let connect = tokio_tungstenite::connect_async(&url);
    let (ws, _) = tokio::time::timeout(channel.connect_timeout(), connect)
        .await
        .map_err(|_| "gateway connect timed out".to_string())?
        .map_err(|e| e.to_string())?;
    let (mut sink, mut stream) = ws.split();

    let first = tokio::select! {
        _ = channel.stop_requested() => {
            let _ = sink.send(Message::Close(None)).await;
            return Ok(SessionEnd::Stopped);
        }
        first = tokio::time::timeout(channel.connect_timeout(), stream.next()) => first,
    };
    let first = first
        .map_err(|_| "gateway sent no hello in time".to_string())?
        .ok_or("gateway closed before hello")?
        .map_err(|e| e.to_string())?;
    let Message::Text(hello_text) = first else {
        return Err("expected text hello frame".to_string());
    };
    let hello: WsPayload = serde_json::from_str(&hello_text).map_err(|e| e.to_string())?;
    if hello.op != OP_HELLO {
        return Err(format!("expected hello (op {}), got op {}", OP_HELLO, hello.op));
    }
    let hello: HelloData = serde_json::from_value(hello.d).map_err(|e| e.to_string())?;
    let interval = Duration::from_millis(hello.heartbeat_interval.max(1000));

    let auth = channel.api().token().authorization();
    send_payload(&mut sink, &payload::identify(&auth, INTENT_PUBLIC_GUILD_MESSAGES)).await?;

    let mut last_seq: Option<u64> = None;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        tokio::select! {
            _ = channel.stop_requested() => {
                let _ = sink.send(Message::Close(None)).await;
                return Ok(SessionEnd::Stopped);
            }
            _ = ticker.tick() => {
                send_payload(&mut sink, &payload::heartbeat(last_seq)).await?;
            }
            frame = stream.next() => {
                let Some(frame) = frame else {
                    return Ok(SessionEnd::Reconnect);
                };
                let text = match frame.map_err(|e| e.to_string())? {
                    Message::Text(t) => t,
                    Message::Close(reason) => {
                        log::info!("qq gateway closed connection: {:?}", reason);
                        return Ok(SessionEnd::Reconnect);
                    }
                    _ => continue,
                };
                let payload: WsPayload = match serde_json::from_str(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        log::debug!("qq: ignoring undecodable frame: {}", e);
                        continue;
                    }
                };
                if let Some(s) = payload.s {
                    last_seq = Some(s);
                }
                match payload.op {
                    OP_DISPATCH => {
                        if let Some(msg) = inbound_from_dispatch(payload) {
                            if inbound_tx.send(msg).await.is_err() {
                                return Ok(SessionEnd::InboundClosed);
                            }
                        }
                    }
                    OP_HEARTBEAT_ACK => log::trace!("qq: heartbeat ack"),
                    OP_RECONNECT => return Ok(SessionEnd::Reconnect),
                    OP_INVALID_SESSION => {
                        return Err("invalid session; check appid, token and intents".to_string());
                    }
                    op => log::debug!("qq: unhandled op {}", op),
                }
            }
        }
    }
}

async fn send_payload<S>(sink: &mut S, payload: &WsPayload) -> Result<(), String>
where
    S: futures_util::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = serde_json::to_string(payload).map_err(|e| e.to_string())?;
    sink.send(Message::Text(text)).await.map_err(|e| e.to_string())
}

/// Turn a dispatch frame into an inbound message. Only `AT_MESSAGE_CREATE` yields one.
fn inbound_from_dispatch(payload: WsPayload) -> Option<InboundMessage> {
    match payload.t.as_deref() {
        Some(EVENT_READY) => {
            if let Ok(ready) = serde_json::from_value::<ReadyData>(payload.d) {
                let name = ready.user.map(|u| u.username).unwrap_or_default();
                log::info!("qq gateway ready: session {} as {:?}", ready.session_id, name);
            }
            None
        }
        Some(EVENT_AT_MESSAGE_CREATE) => match serde_json::from_value::<AtMessageData>(payload.d) {
            Ok(data) => Some(data.into()),
            Err(e) => {
                log::warn!("qq: malformed AT_MESSAGE_CREATE: {}", e);
                None
            }
        },
        other => {
            log::debug!("qq: ignoring event {:?}", other);
            None
        }
    }
}
