//! Configuration module - environment variable parsing and engine tuning

use std::env;
use std::time::Duration;

/// Engine configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the authoritative match server
    pub api_base_url: String,
    /// Bearer token identifying the local session
    pub auth_token: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Delay before re-opening a lost event channel
    pub reconnect_delay: Duration,
    /// Window within which a completed fetch suppresses a debounced one
    pub debounce_window: Duration,
    /// Delay before the second fetch after a turn/match transition
    pub settle_delay: Duration,
    /// Timeout applied to request/response calls
    pub request_timeout: Duration,
}

impl Config {
    /// Configuration with default timing knobs
    pub fn new(api_base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            auth_token: auth_token.into(),
            log_level: "info".to_string(),
            reconnect_delay: Duration::from_secs(5),
            debounce_window: Duration::from_millis(50),
            settle_delay: Duration::from_millis(100),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url =
            env::var("MATCH_API_URL").map_err(|_| ConfigError::Missing("MATCH_API_URL"))?;
        let auth_token =
            env::var("MATCH_API_TOKEN").map_err(|_| ConfigError::Missing("MATCH_API_TOKEN"))?;

        let mut config = Self::new(api_base_url, auth_token);

        if let Ok(level) = env::var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(delay) = millis_var("RECONNECT_DELAY_MS")? {
            config.reconnect_delay = delay;
        }
        if let Some(window) = millis_var("FETCH_DEBOUNCE_MS")? {
            config.debounce_window = window;
        }
        if let Some(delay) = millis_var("SETTLE_FETCH_DELAY_MS")? {
            config.settle_delay = delay;
        }
        if let Some(timeout) = millis_var("REQUEST_TIMEOUT_MS")? {
            config.request_timeout = timeout;
        }

        Ok(config)
    }
}

fn millis_var(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
