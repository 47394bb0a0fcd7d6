//! Authentication extractors.
//!
//! A visitor counts as signed in while an access token is stored in their
//! session. Whether the backend still accepts that token is only learned on
//! the next API call, where the client refreshes it or ends the session.

use axum::{
    extract::FromRequestParts,
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::api::User;
use crate::services::accounts::{AuthStatus, auth_status};

/// Extractor that requires a signed-in visitor.
///
/// Otherwise the visitor is redirected to the login page, which sends them
/// back here after signing in.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.map_or("shopper", |u| u.username.as_str()))
/// }
/// ```
pub struct RequireAuth(pub Option<User>);

/// Error returned when authentication is required but the visitor is not signed in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, remembering where the visitor was going.
    RedirectToLogin(String),
    /// No session layer is installed.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(location) => Redirect::to(&location).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Path of the login page.
pub const LOGIN_PATH: &str = "/auth/login";

/// Login URL that returns to `path` afterwards.
#[must_use]
pub fn login_redirect(path: &str) -> String {
    format!("{LOGIN_PATH}?next={}", urlencoding::encode(path))
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let AuthStatus {
            is_authenticated,
            user,
        } = auth_status(session).await;

        if !is_authenticated {
            // Only a GET can be replayed by following `next`
            let location = if parts.method == Method::GET {
                let target = parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
                login_redirect(target)
            } else {
                LOGIN_PATH.to_string()
            };
            return Err(AuthRejection::RedirectToLogin(location));
        }

        Ok(Self(user))
    }
}
