//! Client for the shop's REST backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for catalog, carts, orders and tokens
//! - Every call goes through [`ApiSession`], which pairs the shared
//!   [`ApiClient`] with the visitor's [`TokenStore`]
//! - A `401` is answered by one token refresh and one replay of the request
//! - Category listings are cached in memory via `moka` (5 minute TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::api::{ApiClient, SessionTokenStore};
//!
//! let tokens = SessionTokenStore::new(session);
//! let api = state.api().session(&tokens);
//!
//! let cart = api.my_cart().await?;
//! let cart = api.add_to_cart(&product_id, 2).await?;
//! ```

mod accounts;
mod client;
mod orders;
mod products;
pub mod tokens;
pub mod types;

pub use client::{ApiClient, ApiRequest, ApiSession};
pub use tokens::{MemoryTokenStore, SessionTokenStore, TokenStore, TokenStoreError};
pub use types::*;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Keys checked, in order, when turning an error body into a message.
const MESSAGE_KEYS: [&str; 4] = ["non_field_errors", "detail", "error", "message"];

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API request failed with status {status}")]
    Status {
        /// Response status code.
        status: StatusCode,
        /// Response body, when it was valid JSON.
        body: Option<Value>,
    },

    /// A success body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The access token was rejected and could not be refreshed.
    ///
    /// Stored credentials have already been cleared when this is returned.
    #[error("Session expired")]
    SessionExpired,

    /// The credential store failed.
    #[error("Credential store error: {0}")]
    Store(#[from] TokenStoreError),

    /// The request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Status code of a backend rejection, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the visitor has to sign in again.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Human-readable message carried in the backend's error body.
    ///
    /// Looks at `non_field_errors`, `detail`, `error` and `message` in that
    /// order, then falls back to the first field holding a list of strings
    /// (the shape of per-field validation errors).
    #[must_use]
    pub fn backend_message(&self) -> Option<String> {
        match self {
            Self::Status {
                body: Some(body), ..
            } => extract_message(body),
            _ => None,
        }
    }
}

fn extract_message(body: &Value) -> Option<String> {
    if let Value::String(text) = body {
        return non_empty(text);
    }

    let fields = body.as_object()?;

    MESSAGE_KEYS
        .iter()
        .filter_map(|key| fields.get(*key))
        .find_map(first_text)
        .or_else(|| {
            fields
                .values()
                .find_map(|value| value.as_array()?.first()?.as_str().and_then(non_empty))
        })
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text),
        Value::Array(items) => items.first()?.as_str().and_then(non_empty),
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}
