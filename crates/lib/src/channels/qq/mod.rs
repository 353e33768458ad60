//! QQ guild bot channel: gateway WebSocket for @-messages in, OpenAPI for replies out.

mod api;
pub mod payload;
mod session;

pub use api::{resolve_api_base, QqApi, QqError, Token};

use crate::channels::handle::ChannelHandle;
use crate::channels::inbound::InboundMessage;
use crate::channels::outbound::OutboundReply;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// QQ channel connector: keeps a gateway session open and posts replies via the OpenAPI.
pub struct QqChannel {
    id: String,
    api: QqApi,
    connect_timeout: Duration,
    running: AtomicBool,
    stop: Notify,
}

impl QqChannel {
    pub fn new(api: QqApi, connect_timeout: Duration) -> Self {
        Self {
            id: "qq".to_string(),
            api,
            connect_timeout,
            running: AtomicBool::new(false),
            stop: Notify::new(),
        }
    }

    pub fn api(&self) -> &QqApi {
        &self.api
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    async fn stop_requested(&self) {
        self.stop.notified().await
    }

    /// Start the gateway session loop and forward @-messages.
    /// Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("qq channel: starting gateway session loop");
        tokio::spawn(async move {
            session::run_session_loop(self, inbound_tx).await;
        })
    }
}

#[async_trait]
impl ChannelHandle for QqChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_one();
    }

    async fn send_reply(&self, reply: &OutboundReply) -> Result<(), String> {
        self.api.post_message(reply).await.map_err(|e| e.to_string())
    }
}
