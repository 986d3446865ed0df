//! Local cache of the provider session secret.
//!
//! Providers hand out a secret at sign-in that must be replayed on later
//! calls. This is the only session state kept on the client.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use quill_shared::types::{SessionId, UserId};
use quill_shared::{AppError, AppResult};

/// File name of the persisted session inside the settings directory.
pub const SESSION_FILE: &str = "session.json";

/// A session secret as cached by a provider binding.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Provider that issued the secret.
    pub provider: String,
    /// Provider session ID.
    pub session_id: SessionId,
    /// Account that owns the session.
    pub user_id: UserId,
    /// Secret replayed on authenticated calls.
    pub secret: String,
    /// Expiry reported by the provider.
    pub expires_at: Option<DateTime<Utc>>,
    /// Long-lived token that trades for a new secret once this one expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl StoredSession {
    /// True when the provider-reported expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// True when the secret was issued by `provider` and is still valid.
    #[must_use]
    pub fn is_usable_for(&self, provider: &str, now: DateTime<Utc>) -> bool {
        self.provider == provider && !self.is_expired(now)
    }
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("provider", &self.provider)
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("secret", &"[hidden]")
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[hidden]"),
            )
            .finish()
    }
}

/// Storage for at most one session secret.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Returns the cached session, if any.
    async fn load(&self) -> AppResult<Option<StoredSession>>;

    /// Replaces the cached session.
    async fn store(&self, session: &StoredSession) -> AppResult<()>;

    /// Forgets the cached session. Clearing an empty cache is not an error.
    async fn clear(&self) -> AppResult<()>;
}

/// In-process session cache.
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    slot: RwLock<Option<StoredSession>>,
}

impl MemorySessionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn load(&self) -> AppResult<Option<StoredSession>> {
        Ok(self.slot.read().await.clone())
    }

    async fn store(&self, session: &StoredSession) -> AppResult<()> {
        *self.slot.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        self.slot.write().await.take();
        Ok(())
    }
}

/// Session cache persisted as JSON, so separate CLI runs share a sign-in.
#[derive(Debug, Clone)]
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    /// Uses `path` as the session file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses [`SESSION_FILE`] inside `settings_dir`.
    #[must_use]
    pub fn in_dir(settings_dir: &Path) -> Self {
        Self::new(settings_dir.join(SESSION_FILE))
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(path: &Path, err: &std::io::Error) -> AppError {
    AppError::Internal(format!("session file {}: {err}", path.display()))
}

#[async_trait]
impl SessionCache for FileSessionCache {
    async fn load(&self) -> AppResult<Option<StoredSession>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.path, &e)),
        };
        match serde_json::from_slice(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A damaged file reads as signed out; the next sign-in overwrites it.
                debug!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    async fn store(&self, session: &StoredSession) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }
        let raw = serde_json::to_vec_pretty(session)
            .map_err(|e| AppError::Internal(format!("encoding session: {e}")))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| io_error(&self.path, &e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| io_error(&self.path, &e))?;
        }
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&self.path, &e)),
        }
    }
}
