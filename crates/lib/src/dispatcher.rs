//! Dispatcher: turns one @-message into exactly one reply.
//!
//! Greeting → fixed prompt. Anything else → weather lookup for the second token, replying
//! with the forecast, or with a short apology when the lookup fails.

use crate::channels::{ChannelHandle, InboundMessage, OutboundReply};
use crate::command::{parse_intent, Intent};
use crate::weather::{WeatherLookup, WeatherRecord};
use std::sync::Arc;

pub const GREETING_REPLY: &str = "你好，请问想查询哪个城市的天气呢";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("sending reply failed: {0}")]
    Send(String),
}

/// Stateless: safe to share across concurrent message tasks.
pub struct Dispatcher {
    weather: Arc<dyn WeatherLookup>,
    channel: Arc<dyn ChannelHandle>,
}

impl Dispatcher {
    pub fn new(weather: Arc<dyn WeatherLookup>, channel: Arc<dyn ChannelHandle>) -> Self {
        Self { weather, channel }
    }

    /// Build the reply for `msg` without sending it.
    pub async fn reply_for(&self, msg: &InboundMessage) -> OutboundReply {
        match parse_intent(&msg.content) {
            Intent::Greeting => OutboundReply::to(msg, GREETING_REPLY),
            Intent::Weather { city } => match self.weather.lookup(&city).await {
                Ok(record) => {
                    OutboundReply::to(msg, format_weather(&record)).with_image(record.weather_icon)
                }
                Err(e) => {
                    log::warn!("message {}: no weather for {:?}: {}", msg.id, city, e);
                    OutboundReply::to(msg, format_lookup_failure(&city, &e.to_string()))
                }
            },
        }
    }

    /// Handle one inbound message: one send, no retries.
    pub async fn handle(&self, msg: InboundMessage) -> Result<(), DispatchError> {
        let reply = self.reply_for(&msg).await;
        log::debug!("message {}: replying in channel {}", msg.id, reply.channel_id);
        self.channel
            .send_reply(&reply)
            .await
            .map_err(DispatchError::Send)
    }
}

/// `城市 天气 日期 星期\n低温~高温 当前温度：当前`
pub fn format_weather(r: &WeatherRecord) -> String {
    format!(
        "{} {} {} {}\n{}~{} 当前温度：{}",
        r.citynm, r.weather, r.days, r.week, r.temp_low, r.temp_high, r.temperature_curr
    )
}

pub fn format_lookup_failure(city: &str, reason: &str) -> String {
    format!("抱歉，没有查询到「{}」的天气：{}", city, reason)
}
