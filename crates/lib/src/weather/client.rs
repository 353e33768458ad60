//! HTTP client for the weather API.

use crate::config::WeatherConfig;
use crate::context::BotContext;
use crate::weather::envelope::{WeatherEnvelope, WeatherRecord};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("weather api returned {0}")]
    Status(String),
    #[error("weather response is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
    /// Upstream answered but reported failure; carries the upstream `msg`.
    #[error("{0}")]
    Api(String),
}

/// Outcome of one lookup: the record, or why there is none.
pub type WeatherQueryResult = Result<WeatherRecord, WeatherError>;

/// Anything that can look up today's weather for a city.
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn lookup(&self, city: &str) -> WeatherQueryResult;
}

/// Client for the k780 `weather.today` API.
#[derive(Clone)]
pub struct WeatherClient {
    config: WeatherConfig,
    client: reqwest::Client,
}

impl WeatherClient {
    /// Uses the context's shared HTTP client, so the lookup gets the same timeout as every
    /// other call.
    pub fn new(ctx: &BotContext) -> Self {
        Self {
            config: ctx.config.weather.clone(),
            client: ctx.http.clone(),
        }
    }

    fn query<'a>(&'a self, city: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("app", self.config.app.as_str()),
            ("cityNm", city),
            ("appkey", self.config.appkey.as_str()),
            ("sign", self.config.sign.as_str()),
            ("format", "json"),
        ]
    }

    /// GET {endpoint}?app=..&cityNm=..&appkey=..&sign=..&format=json
    pub async fn fetch_envelope(&self, city: &str) -> Result<WeatherEnvelope, WeatherError> {
        let res = self
            .client
            .get(&self.config.endpoint)
            .query(&self.query(city))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(WeatherError::Status(format!("{} {}", status, body)));
        }
        let body = res.bytes().await?;
        let envelope: WeatherEnvelope = serde_json::from_slice(&body)?;
        Ok(envelope)
    }
}

/// Reduce an envelope to a record. Anything but the success flag is a failure.
pub(crate) fn into_result(envelope: WeatherEnvelope) -> WeatherQueryResult {
    if !envelope.is_success() {
        let msg = envelope
            .msg
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(WeatherError::Api(msg));
    }
    envelope
        .result
        .ok_or_else(|| WeatherError::Api("missing result".to_string()))
}

#[async_trait]
impl WeatherLookup for WeatherClient {
    async fn lookup(&self, city: &str) -> WeatherQueryResult {
        let result = self.fetch_envelope(city).await.and_then(into_result);
        match &result {
            Ok(r) => log::debug!("weather lookup for {:?}: {} {}", city, r.citynm, r.weather),
            Err(e) => log::warn!("weather lookup for {:?} failed: {}", city, e),
        }
        result
    }
}
