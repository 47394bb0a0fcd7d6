//! Per-page operations ("hooks") on top of the API client.
//!
//! A hook calls one or more API endpoints, turns any failure into a message
//! the shopper can read, queues that message as a flash notification, and
//! hands the page a [`HookResult`]. Pages never format backend errors
//! themselves: they either redirect to the login page
//! ([`HookError::SessionExpired`]) or re-render, knowing the message is
//! already queued ([`HookError::Reported`]).
//!
//! # Hooks
//!
//! - `accounts` - login, registration, logout, auth status, profile
//! - `products` - catalog listing, product detail, categories
//! - `orders` - cart, checkout, order history, cancellation

pub mod accounts;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod validation;

use thiserror::Error;
use tower_sessions::Session;

use crate::api::ApiError;
use crate::error::add_breadcrumb;
use crate::models::Flash;

/// Message shown when the session could not be refreshed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Why a hook did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// Credentials were cleared; the visitor must sign in again.
    #[error("session expired")]
    SessionExpired,

    /// A message has been queued for the visitor.
    #[error("{0}")]
    Reported(String),
}

/// Result type for hooks.
pub type HookResult<T> = Result<T, HookError>;

/// Queue a message for an API failure and classify it.
///
/// The message is the backend's own when it sent one, otherwise `fallback`.
/// Failures the shopper cannot fix (network errors, 5xx) are also sent to
/// Sentry.
pub(crate) async fn report(session: &Session, error: &ApiError, fallback: &str) -> HookError {
    if error.is_session_expired() {
        add_breadcrumb("auth", "Session expired", None);
        notifications::push(session, Flash::error(SESSION_EXPIRED_MESSAGE)).await;
        return HookError::SessionExpired;
    }

    match error.status() {
        Some(status) if status.is_client_error() => {
            tracing::info!(%status, error = %error, "Backend rejected request");
        }
        _ => {
            tracing::error!(error = %error, "Backend request failed");
            sentry::capture_error(error);
        }
    }

    let message = error
        .backend_message()
        .unwrap_or_else(|| fallback.to_owned());
    notifications::push(session, Flash::error(message.clone())).await;
    HookError::Reported(message)
}

/// Pass a value through, or [`report`] the error with `fallback`.
pub(crate) async fn settle<T>(
    session: &Session,
    result: Result<T, ApiError>,
    fallback: &str,
) -> HookResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => Err(report(session, &e, fallback).await),
    }
}

/// Queue a message for a form that failed validation.
pub(crate) async fn reject(session: &Session, error: &validation::ValidationError) -> HookError {
    let message = error.to_string();
    notifications::push(session, Flash::error(message.clone())).await;
    HookError::Reported(message)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore, Session};

    pub fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }
}
