//! Credential storage.
//!
//! The API client never owns credentials. It reads and writes them through a
//! [`TokenStore`], so the same refresh logic serves a cookie session in the
//! web app and a plain in-memory store in tests.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_sessions::Session;

use crate::api::types::{AuthResponse, User};
use crate::models::session_keys;

/// Errors raised by a credential store.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// The session backend failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Where a visitor's access token, refresh token and user live.
///
/// The three values are written together on sign-in and removed together on
/// sign-out or refresh failure. Only the access token (and, when the backend
/// rotates it, the refresh token) changes on its own.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Current access token, if signed in.
    async fn access_token(&self) -> Result<Option<SecretString>, TokenStoreError>;

    /// Current refresh token, if signed in.
    async fn refresh_token(&self) -> Result<Option<SecretString>, TokenStoreError>;

    /// Cached user from the last sign-in.
    async fn user(&self) -> Result<Option<User>, TokenStoreError>;

    /// Store the full credential triple from a login or registration.
    async fn save_credentials(&self, auth: &AuthResponse) -> Result<(), TokenStoreError>;

    /// Replace the access token after a refresh.
    async fn save_access_token(&self, access: &str) -> Result<(), TokenStoreError>;

    /// Replace the refresh token after the backend rotated it.
    async fn save_refresh_token(&self, refresh: &str) -> Result<(), TokenStoreError>;

    /// Remove all three credential values.
    async fn clear(&self) -> Result<(), TokenStoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Session-backed store
// ─────────────────────────────────────────────────────────────────────────────

/// Credential store backed by the visitor's cookie session.
#[derive(Debug, Clone)]
pub struct SessionTokenStore {
    session: Session,
}

impl SessionTokenStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// The underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    async fn secret(&self, key: &str) -> Result<Option<SecretString>, TokenStoreError> {
        Ok(self
            .session
            .get::<String>(key)
            .await?
            .map(SecretString::from))
    }

    async fn write_credentials(&self, auth: &AuthResponse) -> Result<(), TokenStoreError> {
        self.session
            .insert(session_keys::ACCESS_TOKEN, &auth.access)
            .await?;
        self.session
            .insert(session_keys::REFRESH_TOKEN, &auth.refresh)
            .await?;
        self.session.insert(session_keys::USER, &auth.user).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for SessionTokenStore {
    async fn access_token(&self) -> Result<Option<SecretString>, TokenStoreError> {
        self.secret(session_keys::ACCESS_TOKEN).await
    }

    async fn refresh_token(&self) -> Result<Option<SecretString>, TokenStoreError> {
        self.secret(session_keys::REFRESH_TOKEN).await
    }

    async fn user(&self) -> Result<Option<User>, TokenStoreError> {
        Ok(self.session.get(session_keys::USER).await?)
    }

    async fn save_credentials(&self, auth: &AuthResponse) -> Result<(), TokenStoreError> {
        let result = self.write_credentials(auth).await;
        if result.is_err() {
            // Never leave half a credential triple behind.
            if let Err(e) = self.clear().await {
                tracing::error!(error = %e, "Failed to clear partially stored credentials");
            }
        }
        result
    }

    async fn save_access_token(&self, access: &str) -> Result<(), TokenStoreError> {
        self.session
            .insert(session_keys::ACCESS_TOKEN, access)
            .await?;
        Ok(())
    }

    async fn save_refresh_token(&self, refresh: &str) -> Result<(), TokenStoreError> {
        self.session
            .insert(session_keys::REFRESH_TOKEN, refresh)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        for key in session_keys::CREDENTIALS {
            self.session.remove_value(key).await?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct StoredCredentials {
    access: Option<String>,
    refresh: Option<String>,
    user: Option<User>,
}

/// Credential store held in process memory.
///
/// Every operation takes one lock, so [`TokenStore::clear`] removes all three
/// values atomically.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<StoredCredentials>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given tokens and no cached user.
    #[must_use]
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            inner: Mutex::new(StoredCredentials {
                access: access.map(str::to_owned),
                refresh: refresh.map(str::to_owned),
                user: None,
            }),
        }
    }

    /// Whether no credential value is stored.
    pub async fn is_empty(&self) -> bool {
        let stored = self.inner.lock().await;
        stored.access.is_none() && stored.refresh.is_none() && stored.user.is_none()
    }
}

impl std::fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTokenStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn access_token(&self) -> Result<Option<SecretString>, TokenStoreError> {
        Ok(self.inner.lock().await.access.clone().map(SecretString::from))
    }

    async fn refresh_token(&self) -> Result<Option<SecretString>, TokenStoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .refresh
            .clone()
            .map(SecretString::from))
    }

    async fn user(&self) -> Result<Option<User>, TokenStoreError> {
        Ok(self.inner.lock().await.user.clone())
    }

    async fn save_credentials(&self, auth: &AuthResponse) -> Result<(), TokenStoreError> {
        *self.inner.lock().await = StoredCredentials {
            access: Some(auth.access.clone()),
            refresh: Some(auth.refresh.clone()),
            user: Some(auth.user.clone()),
        };
        Ok(())
    }

    async fn save_access_token(&self, access: &str) -> Result<(), TokenStoreError> {
        self.inner.lock().await.access = Some(access.to_owned());
        Ok(())
    }

    async fn save_refresh_token(&self, refresh: &str) -> Result<(), TokenStoreError> {
        self.inner.lock().await.refresh = Some(refresh.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        *self.inner.lock().await = StoredCredentials::default();
        Ok(())
    }
}
