//! Session-related types.
//!
//! The session is the visitor's only local state: the credential triple
//! written by [`crate::api::SessionTokenStore`] and the pending flash
//! notifications.

use serde::{Deserialize, Serialize};

/// Session keys.
pub mod keys {
    /// Key for the bearer access token.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Key for the refresh token.
    pub const REFRESH_TOKEN: &str = "refresh_token";

    /// Key for the cached signed-in user.
    pub const USER: &str = "user";

    /// Key for notifications waiting to be shown on the next page.
    pub const FLASH: &str = "flash";

    /// All keys making up the stored credentials.
    pub const CREDENTIALS: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, USER];
}

/// Severity of a flash notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

impl FlashLevel {
    /// CSS class suffix used by the flash partial.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A one-shot notification shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }
}
