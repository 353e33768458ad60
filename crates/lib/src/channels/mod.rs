//! Communication channels (QQ guild bot).
//!
//! A channel turns platform events into [`InboundMessage`]s sent over an mpsc channel,
//! and exposes a [`ChannelHandle`] for replies and shutdown.

mod handle;
mod inbound;
mod outbound;
pub mod qq;

pub use handle::ChannelHandle;
pub use inbound::InboundMessage;
pub use outbound::OutboundReply;
pub use qq::{QqApi, QqChannel, QqError, Token};
