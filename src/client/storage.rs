//! Durable session storage
//!
//! The token (and the last known user, so the identity can be shown before
//! the restore round-trip finishes) survives restarts. It is read once at
//! startup, written through on every successful login, and erased on logout
//! or when a restore fails.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::error::ClientError;
use crate::shared::User;

/// What gets persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// Durable client-side storage for the session token.
pub trait TokenStore: Send + Sync {
    /// Read the persisted session, if any
    fn load(&self) -> Result<Option<PersistedSession>, ClientError>;

    fn save(&self, session: &PersistedSession) -> Result<(), ClientError>;

    /// Erase the persisted session. Erasing nothing is not an error.
    fn clear(&self) -> Result<(), ClientError>;
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<PersistedSession>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::storage(format!("{}: {}", self.path.display(), e))),
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt file is treated like no session at all.
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable session file");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::storage(format!("{}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .map_err(|e| ClientError::storage(format!("{}: {}", self.path.display(), e)))
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::storage(format!("{}: {}", self.path.display(), e))),
        }
    }
}

/// In-memory store, for tests and for hosts without a data directory
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Option<PersistedSession>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<PersistedSession>>, ClientError> {
        self.inner
            .lock()
            .map_err(|_| ClientError::storage("session store lock poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<PersistedSession>, ClientError> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), ClientError> {
        *self.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.lock()? = None;
        Ok(())
    }
}
