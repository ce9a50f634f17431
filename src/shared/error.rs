//! Shared Error Types
//!
//! Raised by the data model before anything touches the network. The client
//! layer wraps these in `ClientError::Validation`, and their `Display` is what
//! the user sees, so messages are written for people.
//!
//! ```rust
//! use teammatch::shared::error::SharedError;
//!
//! let error = SharedError::validation("content", "Message cannot be empty");
//! assert_eq!(error.to_string(), "Message cannot be empty");
//! assert_eq!(error.field(), Some("content"));
//! ```
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// A payload could not be encoded or decoded
    #[error("Malformed payload: {0}")]
    Json(String),

    /// One field failed a local check
    #[error("{message}")]
    Invalid { field: String, message: String },

    /// Required form fields left blank, in form order
    #[error("Por favor completa todos los campos requeridos: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },
}

impl SharedError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingFields {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The offending field, when there is exactly one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Invalid { field, .. } => Some(field),
            Self::MissingFields { fields } if fields.len() == 1 => Some(&fields[0]),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
