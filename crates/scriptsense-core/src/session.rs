//! Persisted login session.
//!
//! The token, login flag, email and admin flag are one logical group: they are
//! written together by [`SessionStore::create_session`] and removed together by
//! [`SessionStore::clear_session`]. There is no way to update a single field.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub email: String,
    /// Client-side hint only; the backend authorizes every admin request itself.
    pub is_admin: bool,
}

impl Session {
    pub fn new(token: impl Into<String>, email: impl Into<String>, is_admin: bool) -> Self {
        Self {
            token: token.into(),
            email: email.into(),
            is_admin,
        }
    }
}

/// On-disk layout: every value is a plain string.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    token: String,
    #[serde(rename = "loggedIn", default)]
    logged_in: String,
    #[serde(default)]
    email: String,
    #[serde(rename = "isAdmin", default)]
    is_admin: String,
}

impl From<&Session> for StoredSession {
    fn from(s: &Session) -> Self {
        Self {
            token: s.token.clone(),
            logged_in: "true".to_string(),
            email: s.email.clone(),
            is_admin: s.is_admin.to_string(),
        }
    }
}

impl StoredSession {
    fn into_session(self) -> Option<Session> {
        if self.logged_in != "true" || self.token.is_empty() {
            return None;
        }
        Some(Session {
            token: self.token,
            email: self.email,
            is_admin: self.is_admin == "true",
        })
    }
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current session. Absent, incomplete or corrupt files yield
    /// `Ok(None)`; other IO failures are errors.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<StoredSession>(&bytes) {
            Ok(stored) => Ok(stored.into_session()),
            Err(e) => {
                log::warn!("ignoring corrupt session file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    /// Persist the whole session group in one atomic file replace.
    pub fn create_session(&self, session: &Session) -> Result<(), SessionError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, &StoredSession::from(session))?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        log::info!("session created for {}", session.email);
        Ok(())
    }

    /// Remove every session field. Clearing an absent session is not an error.
    pub fn clear_session(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
