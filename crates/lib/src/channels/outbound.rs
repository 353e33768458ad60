//! Outbound reply to a channel message.

use crate::channels::inbound::InboundMessage;

/// A reply to send: text, an optional image URL, and the message it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub msg_id: String,
    pub channel_id: String,
    pub content: String,
    pub image: Option<String>,
}

impl OutboundReply {
    /// Text reply addressed to the channel of `msg`, referencing its id.
    pub fn to(msg: &InboundMessage, content: impl Into<String>) -> Self {
        Self {
            msg_id: msg.id.clone(),
            channel_id: msg.channel_id.clone(),
            content: content.into(),
            image: None,
        }
    }

    /// Attach an image URL. Empty URLs are dropped.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.image = if url.trim().is_empty() { None } else { Some(url) };
        self
    }
}
