use std::path::PathBuf;
use std::time::Duration;

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://147.182.197.59";

/// Socket.IO endpoint, websocket transport only
const SOCKET_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Client configuration: resolved URLs and timings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_app(app: AppConfig) -> Result<Self, ConfigError> {
        app.validate()?;
        Ok(Self { app })
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self { app: builder.build()? })
    }

    /// Load the config file (default location unless `path` is given) plus env overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.or_else(AppConfig::default_path);
        let app = AppConfig::load(path.as_deref())?;
        Ok(Self { app })
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn server_url(&self) -> &str {
        self.app
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_URL)
            .trim_end_matches('/')
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    /// Realtime base URL: the configured one, or the server URL with a ws scheme
    pub fn ws_base_url(&self) -> String {
        if let Some(ws) = self.app.ws_url.as_deref() {
            return ws.trim_end_matches('/').to_string();
        }
        let server = self.server_url();
        if let Some(rest) = server.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = server.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            server.to_string()
        }
    }

    /// Full Socket.IO websocket URL
    pub fn socket_url(&self) -> String {
        format!("{}{}", self.ws_base_url(), SOCKET_IO_PATH)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.app.debounce_ms)
    }

    pub fn reconnect_enabled(&self) -> bool {
        self.app.reconnect
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.app.reconnect_base_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.app.reconnect_max_delay_ms)
    }

    /// Where the session is persisted
    pub fn session_file(&self) -> Option<PathBuf> {
        self.app.session_file.clone().or_else(|| {
            dirs::data_dir().map(|dir| dir.join("teammatch").join("session.json"))
        })
    }
}
