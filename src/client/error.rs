/**
 * Client Error Types
 *
 * Every fallible client operation returns `ClientError`.
 *
 * # Error Categories
 *
 * - `Validation` - local, pre-network checks (blank message, missing form fields)
 * - `Unauthorized` - invalid credentials or a missing/expired token (401/403)
 * - `Api` - any other non-success HTTP status
 * - `Network` / `Decode` - transport failures and unreadable bodies
 * - `Channel` - realtime connection failures; logged, never blocking
 * - `Storage` / `Config` - local persistence and configuration
 */
use thiserror::Error;

use crate::shared::{ConfigError, SharedError};

/// Shown when the server gives no message
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Client-side error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] SharedError),

    #[error("{}", .message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE))]
    Unauthorized { status: u16, message: Option<String> },

    #[error("{}", .message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE))]
    Api { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Build the error for a non-success status
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.filter(|m| !m.trim().is_empty());
        match status {
            401 | 403 => Self::Unauthorized { status, message },
            _ => Self::Api { status, message },
        }
    }

    /// Replace a missing server message with an operation-specific one.
    pub fn or_message(self, fallback: &str) -> Self {
        match self {
            Self::Api { status, message: None } => Self::Api {
                status,
                message: Some(fallback.to_string()),
            },
            Self::Unauthorized { status, message: None } => Self::Unauthorized {
                status,
                message: Some(fallback.to_string()),
            },
            other => other,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Unauthorized { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
