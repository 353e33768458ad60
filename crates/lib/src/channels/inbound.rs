//! Inbound message from a channel: one @-mention of the bot, handed to the dispatcher.

/// A message that mentioned the bot. Consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Platform message id; replies reference it.
    pub id: String,
    pub channel_id: String,
    /// Raw text including the mention, e.g. `"<@!1234> 北京"`.
    pub content: String,
}
