//! Bot context: what every component needs, built once at startup and passed explicitly.

use crate::config::Config;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Shared config plus one HTTP client. The client carries the timeout applied to every
/// outbound call and is safe to use from concurrent message tasks.
#[derive(Clone)]
pub struct BotContext {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

impl BotContext {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}
