//! Integration tests: QQ channel against a local fake OpenAPI + gateway, and the full
//! mention → weather → reply path. Fake server tasks are left running when each test ends.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use lib::channels::{ChannelHandle, InboundMessage, OutboundReply, QqApi, QqChannel};
use lib::config::Config;
use lib::context::BotContext;
use lib::dispatcher::Dispatcher;
use lib::weather::WeatherClient;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fake OpenAPI + gateway. The flags shape how each gateway connection behaves.
#[derive(Clone, Default)]
struct FakeQq {
    base: Arc<Mutex<String>>,
    posted: Arc<Mutex<Vec<(String, String, serde_json::Value)>>>,
    identify: Arc<Mutex<Option<serde_json::Value>>>,
    identifies: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
    heartbeats: Arc<Mutex<Vec<serde_json::Value>>>,
    /// Never send Hello.
    silent: bool,
    /// Ask the client to reconnect right after the first Identify.
    reconnect_first: bool,
    /// Hello interval in ms; 0 means 45000.
    heartbeat_interval: u64,
}

async fn gateway(State(fake): State<FakeQq>) -> Json<serde_json::Value> {
    let ws = fake.base.lock().unwrap().replace("http://", "ws://");
    Json(json!({ "url": format!("{}/websocket", ws) }))
}

async fn post_message(
    State(fake): State<FakeQq>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    fake.posted.lock().unwrap().push((channel_id, auth, body));
    Json(json!({ "id": "reply-1" }))
}

async fn websocket(State(fake): State<FakeQq>, ws: WebSocketUpgrade) -> Response {
    fake.connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| gateway_session(socket, fake))
}

/// Hello, wait for Identify, then one READY and one @-message. Heartbeats are recorded.
async fn gateway_session(mut socket: WebSocket, fake: FakeQq) {
    if fake.silent {
        while let Some(Ok(_)) = socket.recv().await {}
        return;
    }
    let interval = match fake.heartbeat_interval {
        0 => 45000,
        ms => ms,
    };
    let hello = json!({ "op": 10, "d": { "heartbeat_interval": interval } });
    if socket.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }
    let mut identified = 0;
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };
        let v: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        if v["op"] == 2 {
            *fake.identify.lock().unwrap() = Some(v);
            identified = fake.identifies.fetch_add(1, Ordering::SeqCst) + 1;
            break;
        }
    }
    if identified == 0 {
        return;
    }
    if fake.reconnect_first && identified == 1 {
        let _ = socket.send(Message::Text(json!({ "op": 7 }).to_string())).await;
        while let Some(Ok(_)) = socket.recv().await {}
        return;
    }
    let ready = json!({ "op": 0, "s": 1, "t": "READY",
        "d": { "session_id": "sess-1", "user": { "id": "b1", "username": "weather-bot" } } });
    let at = json!({ "op": 0, "s": 2, "t": "AT_MESSAGE_CREATE",
        "d": {
            "id": "m-77",
            "channel_id": "c-5",
            "guild_id": "g-1",
            "content": "<@!b1> 北京"
        } });
    let _ = socket.send(Message::Text(ready.to_string())).await;
    let _ = socket.send(Message::Text(at.to_string())).await;
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };
        let v: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        if v["op"] == 1 {
            fake.heartbeats.lock().unwrap().push(v["d"].clone());
        }
    }
}

async fn spawn_fake_qq() -> FakeQq {
    spawn_fake_qq_with(FakeQq::default()).await
}

async fn spawn_fake_qq_with(fake: FakeQq) -> FakeQq {
    let app = Router::new()
        .route("/gateway", get(gateway))
        .route("/websocket", get(websocket))
        .route("/channels/:channel_id/messages", post(post_message))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake qq");
    let addr = listener.local_addr().expect("local_addr");
    *fake.base.lock().unwrap() = format!("http://{}", addr);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    fake
}

async fn spawn_fake_weather(body: &'static str) -> String {
    let app = Router::new().route("/", get(move || async move { body }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake weather");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}/", addr)
}

fn config(api_base: String, weather_endpoint: String) -> Config {
    let mut config = Config::default();
    config.appid = 102001;
    config.token = "secret".to_string();
    config.api_base = Some(api_base);
    config.weather.endpoint = weather_endpoint;
    config
}

fn context(api_base: String, weather_endpoint: String) -> BotContext {
    BotContext::new(config(api_base, weather_endpoint)).expect("context")
}

async fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    done()
}

#[tokio::test]
async fn send_reply_posts_message_with_bot_authorization() {
    let fake = spawn_fake_qq().await;
    let base = fake.base.lock().unwrap().clone();
    let ctx = context(base, "http://127.0.0.1:9/".to_string());
    let channel = QqChannel::new(QqApi::new(&ctx), ctx.timeout());

    let reply = OutboundReply {
        msg_id: "m-1".to_string(),
        channel_id: "c-1".to_string(),
        content: "你好".to_string(),
        image: Some("http://x/icon.png".to_string()),
    };
    channel.send_reply(&reply).await.expect("send");

    let posted = fake.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    let (channel_id, auth, body) = &posted[0];
    assert_eq!(channel_id, "c-1");
    assert_eq!(auth, "Bot 102001.secret");
    assert_eq!(
        body,
        &json!({ "content": "你好", "msg_id": "m-1", "image": "http://x/icon.png" })
    );
}

#[tokio::test]
async fn gateway_session_identifies_and_forwards_at_messages() {
    let fake = spawn_fake_qq().await;
    let base = fake.base.lock().unwrap().clone();
    let ctx = context(base, "http://127.0.0.1:9/".to_string());
    let channel = Arc::new(QqChannel::new(QqApi::new(&ctx), ctx.timeout()));

    let (tx, mut rx) = tokio::sync::mpsc::channel::<InboundMessage>(8);
    let session = channel.clone().start_inbound(tx);
    let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("inbound within 5s")
        .expect("inbound message");
    assert_eq!(
        msg,
        InboundMessage {
            id: "m-77".to_string(),
            channel_id: "c-5".to_string(),
            content: "<@!b1> 北京".to_string(),
        }
    );

    let identify = fake.identify.lock().unwrap().clone().expect("identify sent");
    assert_eq!(identify["d"]["token"], "Bot 102001.secret");
    assert_eq!(identify["d"]["intents"], 1u64 << 30);

    channel.stop();
    tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("session loop stops")
        .expect("session task");
}

#[tokio::test]
async fn stop_ends_session_waiting_for_hello() {
    let fake = spawn_fake_qq_with(FakeQq {
        silent: true,
        ..FakeQq::default()
    })
    .await;
    let base = fake.base.lock().unwrap().clone();
    let ctx = context(base, "http://127.0.0.1:9/".to_string());
    let channel = Arc::new(QqChannel::new(QqApi::new(&ctx), ctx.timeout()));

    let (tx, _rx) = tokio::sync::mpsc::channel::<InboundMessage>(8);
    let session = channel.clone().start_inbound(tx);
    let connected =
        wait_until(Duration::from_secs(2), || fake.connections.load(Ordering::SeqCst) > 0).await;
    assert!(connected, "client never opened the gateway socket");
    tokio::time::sleep(Duration::from_millis(200)).await;

    channel.stop();
    tokio::time::timeout(Duration::from_secs(1), session)
        .await
        .expect("session loop stops while waiting for hello")
        .expect("session task");
    assert_eq!(fake.identifies.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_hello_times_out_and_reconnects() {
    let fake = spawn_fake_qq_with(FakeQq {
        silent: true,
        ..FakeQq::default()
    })
    .await;
    let base = fake.base.lock().unwrap().clone();
    let mut config = config(base, "http://127.0.0.1:9/".to_string());
    config.timeout_secs = 1;
    let ctx = BotContext::new(config).expect("context");
    let channel = Arc::new(QqChannel::new(QqApi::new(&ctx), ctx.timeout()));

    let (tx, _rx) = tokio::sync::mpsc::channel::<InboundMessage>(8);
    let session = channel.clone().start_inbound(tx);
    let reconnected =
        wait_until(Duration::from_secs(8), || fake.connections.load(Ordering::SeqCst) >= 2).await;
    channel.stop();
    assert!(reconnected, "no second connection after the hello deadline");
    tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("session loop stops")
        .expect("session task");
}

#[tokio::test]
async fn reconnect_request_identifies_again() {
    let fake = spawn_fake_qq_with(FakeQq {
        reconnect_first: true,
        ..FakeQq::default()
    })
    .await;
    let base = fake.base.lock().unwrap().clone();
    let ctx = context(base, "http://127.0.0.1:9/".to_string());
    let channel = Arc::new(QqChannel::new(QqApi::new(&ctx), ctx.timeout()));

    let (tx, mut rx) = tokio::sync::mpsc::channel::<InboundMessage>(8);
    let session = channel.clone().start_inbound(tx);
    let msg = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("inbound on the second session")
        .expect("inbound message");
    assert_eq!(msg.id, "m-77");
    assert_eq!(fake.identifies.load(Ordering::SeqCst), 2);
    assert_eq!(fake.connections.load(Ordering::SeqCst), 2);

    channel.stop();
    tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("session loop stops")
        .expect("session task");
}

#[tokio::test]
async fn heartbeat_carries_last_sequence() {
    let fake = spawn_fake_qq_with(FakeQq {
        heartbeat_interval: 1000,
        ..FakeQq::default()
    })
    .await;
    let base = fake.base.lock().unwrap().clone();
    let ctx = context(base, "http://127.0.0.1:9/".to_string());
    let channel = Arc::new(QqChannel::new(QqApi::new(&ctx), ctx.timeout()));

    let (tx, mut rx) = tokio::sync::mpsc::channel::<InboundMessage>(8);
    let session = channel.clone().start_inbound(tx);
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("inbound within 5s")
        .expect("inbound message");

    let beat = wait_until(Duration::from_secs(5), || {
        fake.heartbeats.lock().unwrap().iter().any(|d| *d == json!(2))
    })
    .await;
    channel.stop();
    assert!(beat, "heartbeats seen: {:?}", fake.heartbeats.lock().unwrap());
    tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("session loop stops")
        .expect("session task");
}

#[tokio::test]
async fn mention_to_weather_reply_end_to_end() {
    let fake = spawn_fake_qq().await;
    let base = fake.base.lock().unwrap().clone();
    let weather_endpoint = spawn_fake_weather(
        r#"{"success":"1","result":{"citynm":"北京","weather":"晴","days":"2022-03-01","week":"星期二","temp_low":"5","temp_high":"15","temperature_curr":"10","weather_icon":"http://x/icon.png"}}"#,
    )
    .await;
    let ctx = context(base, weather_endpoint);
    let channel = Arc::new(QqChannel::new(QqApi::new(&ctx), ctx.timeout()));
    let dispatcher = Dispatcher::new(Arc::new(WeatherClient::new(&ctx)), channel);

    dispatcher
        .handle(InboundMessage {
            id: "m-9".to_string(),
            channel_id: "c-3".to_string(),
            content: "@Bot 北京".to_string(),
        })
        .await
        .expect("handled");

    let posted = fake.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    let (channel_id, _, body) = &posted[0];
    assert_eq!(channel_id, "c-3");
    assert_eq!(body["msg_id"], "m-9");
    assert_eq!(body["content"], "北京 晴 2022-03-01 星期二\n5~15 当前温度：10");
    assert_eq!(body["image"], "http://x/icon.png");
}
