//! QQ guild bot OpenAPI: gateway discovery and posting messages.

use crate::channels::outbound::OutboundReply;
use crate::context::BotContext;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://api.sgroup.qq.com";
const SANDBOX_API_BASE: &str = "https://sandbox.api.sgroup.qq.com";

#[derive(Debug, thiserror::Error)]
pub enum QqError {
    #[error("qq request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("qq api error: {0}")]
    Api(String),
}

/// Bot credentials, rendered as the `Authorization: Bot {appid}.{token}` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub appid: u64,
    pub token: String,
}

impl Token {
    pub fn new(appid: u64, token: impl Into<String>) -> Self {
        Self {
            appid,
            token: token.into(),
        }
    }

    pub fn authorization(&self) -> String {
        format!("Bot {}.{}", self.appid, self.token)
    }
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct MessageToCreate<'a> {
    content: &'a str,
    msg_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

/// REST client for the bot OpenAPI.
#[derive(Clone)]
pub struct QqApi {
    base_url: String,
    token: Token,
    client: reqwest::Client,
}

/// Resolve the OpenAPI base: explicit `api_base`, else sandbox or production.
pub fn resolve_api_base(ctx: &BotContext) -> String {
    match ctx.config.api_base.as_deref().map(str::trim) {
        Some(base) if !base.is_empty() => base.trim_end_matches('/').to_string(),
        _ if ctx.config.sandbox => SANDBOX_API_BASE.to_string(),
        _ => API_BASE.to_string(),
    }
}

impl QqApi {
    pub fn new(ctx: &BotContext) -> Self {
        Self {
            base_url: resolve_api_base(ctx),
            token: Token::new(ctx.config.appid, ctx.config.token.clone()),
            client: ctx.http.clone(),
        }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// GET /gateway — WebSocket URL to connect to.
    pub async fn gateway(&self) -> Result<String, QqError> {
        let url = format!("{}/gateway", self.base_url);
        let res = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.token.authorization())
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(QqError::Api(format!("gateway: {} {}", status, body)));
        }
        let data: GatewayResponse = res.json().await?;
        Ok(data.url)
    }

    /// POST /channels/{channel_id}/messages — reply to a message, optionally with an image.
    pub async fn post_message(&self, reply: &OutboundReply) -> Result<(), QqError> {
        let url = format!("{}/channels/{}/messages", self.base_url, reply.channel_id);
        let body = MessageToCreate {
            content: &reply.content,
            msg_id: &reply.msg_id,
            image: reply.image.as_deref(),
        };
        let res = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.token.authorization())
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(QqError::Api(format!("post message: {} {}", status, body)));
        }
        Ok(())
    }
}
