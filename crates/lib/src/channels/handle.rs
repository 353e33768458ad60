//! Channel handle: what the runner and dispatcher need from a running channel.

use crate::channels::outbound::OutboundReply;
use async_trait::async_trait;

/// Handle to a running channel (stop, send reply).
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "qq").
    fn id(&self) -> &str;
    /// Stop the channel connector.
    fn stop(&self);
    /// Send a reply. Delivery is fire-and-forget beyond the call's own result.
    async fn send_reply(&self, reply: &OutboundReply) -> Result<(), String>;
}
