//! Application configuration module
//!
//! `AppConfig` is read from an optional TOML file and then overridden by
//! environment variables:
//!
//! - `TEAMMATCH_API_URL` - REST base URL
//! - `TEAMMATCH_WS_URL` - realtime base URL (defaults to the REST URL with a `ws` scheme)
//!
//! ```toml
//! api_url = "http://147.182.197.59"
//! debounce_ms = 300
//! reconnect = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Environment variable overriding the REST base URL
pub const API_URL_ENV: &str = "TEAMMATCH_API_URL";
/// Environment variable overriding the realtime base URL
pub const WS_URL_ENV: &str = "TEAMMATCH_WS_URL";

const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RECONNECT_BASE_MS: u64 = 1_000;
const DEFAULT_RECONNECT_MAX_MS: u64 = 30_000;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// REST API base URL
    pub api_url: Option<String>,
    /// Realtime channel base URL
    pub ws_url: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Inactivity window before a search/lookup request is issued
    pub debounce_ms: u64,
    /// Whether the realtime channel reconnects after a drop
    pub reconnect: bool,
    /// First reconnect delay
    pub reconnect_base_delay_ms: u64,
    /// Upper bound for the reconnect delay
    pub reconnect_max_delay_ms: u64,
    /// Where the session token is persisted
    pub session_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            ws_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            reconnect: true,
            reconnect_base_delay_ms: DEFAULT_RECONNECT_BASE_MS,
            reconnect_max_delay_ms: DEFAULT_RECONNECT_MAX_MS,
            session_file: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Default location of the TOML config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("teammatch").join("config.toml"))
    }

    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` (if it exists) and apply environment overrides.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
                tracing::debug!(path = %path.display(), "loading config file");
                Self::from_toml_str(&raw)?
            }
            _ => Self::default(),
        };

        if let Ok(api_url) = std::env::var(API_URL_ENV) {
            config.api_url = Some(api_url);
        }
        if let Ok(ws_url) = std::env::var(WS_URL_ENV) {
            config.ws_url = Some(ws_url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.api_url, &self.ws_url].into_iter().flatten() {
            Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", url, e)))?;
        }
        if self.reconnect_base_delay_ms == 0 {
            return Err(ConfigError::MissingValue("reconnect_base_delay_ms"));
        }
        if self.reconnect_max_delay_ms < self.reconnect_base_delay_ms {
            return Err(ConfigError::InvalidValue(
                "reconnect_max_delay_ms must not be below reconnect_base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the REST API URL
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = Some(url.into());
        self
    }

    /// Set the realtime URL
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.config.ws_url = Some(url.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce_ms = ms;
        self
    }

    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.config.reconnect = enabled;
        self
    }

    /// Set the reconnect backoff window
    pub fn reconnect_delays_ms(mut self, base: u64, max: u64) -> Self {
        self.config.reconnect_base_delay_ms = base;
        self.config.reconnect_max_delay_ms = max;
        self
    }

    pub fn session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.session_file = Some(path.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("failed to read config: {0}")]
    Io(String),
}
