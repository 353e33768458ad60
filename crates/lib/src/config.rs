//! Configuration types and loading.
//!
//! Config is loaded from a YAML file (default `config.yaml` in the working directory)
//! and environment. The bot refuses to start without an appid and token.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bot appid from the QQ open platform. Overridden by QQ_BOT_APPID env.
    #[serde(default)]
    pub appid: u64,

    /// Bot token from the QQ open platform. Overridden by QQ_BOT_TOKEN env.
    #[serde(default)]
    pub token: String,

    /// Use the sandbox OpenAPI endpoint instead of production.
    #[serde(default)]
    pub sandbox: bool,

    /// Explicit OpenAPI base URL (wins over `sandbox`). Mostly useful for tests.
    #[serde(default)]
    pub api_base: Option<String>,

    /// Timeout in seconds for every outbound HTTP call (OpenAPI and weather). Default 3.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Weather API settings.
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Weather API endpoint and static credentials embedded in the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_endpoint")]
    pub endpoint: String,

    /// Value of the `app` query parameter (which API method to call).
    #[serde(default = "default_weather_app")]
    pub app: String,

    #[serde(default = "default_weather_appkey")]
    pub appkey: String,

    #[serde(default = "default_weather_sign")]
    pub sign: String,
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_weather_endpoint() -> String {
    "http://api.k780.com/".to_string()
}

fn default_weather_app() -> String {
    "weather.today".to_string()
}

fn default_weather_appkey() -> String {
    "10003".to_string()
}

fn default_weather_sign() -> String {
    "b59bc3ef6191eb9f747dd4e83c99f2a4".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            appid: 0,
            token: String::new(),
            sandbox: false,
            api_base: None,
            timeout_secs: default_timeout_secs(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_weather_endpoint(),
            app: default_weather_app(),
            appkey: default_weather_appkey(),
            sign: default_weather_sign(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Apply QQ_BOT_APPID / QQ_BOT_TOKEN env overrides on top of the file values.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(appid) = non_empty_env("QQ_BOT_APPID") {
        config.appid = appid
            .parse()
            .with_context(|| format!("QQ_BOT_APPID is not a number: {}", appid))?;
    }
    if let Some(token) = non_empty_env("QQ_BOT_TOKEN") {
        config.token = token;
    }
    Ok(())
}

/// Fail fast when credentials are missing: the bot must not serve without them.
pub fn validate(config: &Config) -> Result<()> {
    if config.appid == 0 {
        anyhow::bail!("appid is not configured (set `appid` in the config file or QQ_BOT_APPID)");
    }
    if config.token.trim().is_empty() {
        anyhow::bail!("token is not configured (set `token` in the config file or QQ_BOT_TOKEN)");
    }
    validate_timeout(config)
}

/// A zero timeout would make every request fail at once. Checked even where credentials
/// are not needed, e.g. `weather-bot weather`.
pub fn validate_timeout(config: &Config) -> Result<()> {
    if config.timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be greater than zero");
    }
    Ok(())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WEATHER_BOT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yaml"))
}

/// Parse config from YAML text without env overrides or validation.
pub fn parse_config(s: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(s)?;
    Ok(config)
}

/// Load config from the given path (or WEATHER_BOT_CONFIG / `config.yaml`).
/// Unlike most settings files a missing file is an error, as is a config without credentials.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = read_config_file(&path)?;
    apply_env_overrides(&mut config)?;
    validate(&config).with_context(|| format!("invalid config {}", path.display()))?;
    log::debug!(
        "loaded config from {} (appid {}, sandbox {})",
        path.display(),
        config.appid,
        config.sandbox
    );
    Ok((config, path))
}

fn read_config_file(path: &Path) -> Result<Config> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    parse_config(&s).with_context(|| format!("parsing config from {}", path.display()))
}
