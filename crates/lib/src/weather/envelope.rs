//! Wire types of the weather API response.

use serde::{Deserialize, Serialize};

/// Value of `success` that means the lookup worked.
///
/// The upstream docs say "0 means success, 1 means failure", but real responses use
/// `"1"` for success. We follow the responses.
pub const SUCCESS_FLAG: &str = "1";

/// Top-level response: `{ "success", "result", "msg" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherEnvelope {
    #[serde(default)]
    pub success: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<WeatherRecord>,
    /// Failure reason when `success` is not the success flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl WeatherEnvelope {
    pub fn is_success(&self) -> bool {
        self.success == SUCCESS_FLAG
    }
}

/// Today's weather for one city. Every field is text on the wire, e.g. `"temp_low": "5"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherRecord {
    /// Date, e.g. 2022-03-01.
    pub days: String,
    /// Weekday, e.g. 星期二.
    pub week: String,
    pub citynm: String,
    /// Day's temperature range as text, e.g. "15℃/5℃".
    pub temperature: String,
    pub temperature_curr: String,
    pub humidity: String,
    /// Description, e.g. 晴.
    pub weather: String,
    /// Wind direction.
    pub wind: String,
    /// Wind strength.
    pub winp: String,
    pub temp_high: String,
    pub temp_low: String,
    pub weather_icon: String,
}
