//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Health check
//!
//! # Products
//! GET  /products               - Product listing (?search=&category=)
//! GET  /products/{id}          - Product detail
//!
//! # Cart (requires auth)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart
//! POST /cart/update            - Set line quantity (0 removes)
//! POST /cart/clear             - Empty the cart
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Shipping address form
//! POST /checkout               - Place order
//!
//! # Orders (requires auth)
//! GET  /orders                 - Order history
//! GET  /orders/{id}            - Order detail
//! POST /orders/{id}/cancel     - Cancel order
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                - Profile
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::api::User;
use crate::error::AppError;
use crate::models::Flash;
use crate::services::accounts::auth_status;
use crate::services::{HookError, HookResult, notifications};
use crate::state::AppState;

// =============================================================================
// Page Helpers
// =============================================================================

/// Data every page layout needs: the header's user and pending notifications.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    /// Load the layout data, consuming pending notifications.
    ///
    /// Call this last, after every hook of the request has run, so messages
    /// queued by those hooks are shown on this page.
    pub async fn load(session: &Session) -> Self {
        let status = auth_status(session).await;
        Self {
            user: status.user,
            is_authenticated: status.is_authenticated,
            flashes: notifications::take(session).await,
        }
    }

    /// Name shown in the header.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.user.as_ref().map_or("Account", User::display_name)
    }
}

/// Keep a hook's value, or degrade to `None` once the failure is reported.
///
/// # Errors
///
/// Returns [`AppError::SessionExpired`] if the visitor must sign in again.
pub fn recover<T>(result: HookResult<T>) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(HookError::SessionExpired) => Err(AppError::SessionExpired),
        Err(HookError::Reported(_)) => Ok(None),
    }
}

/// Response for a failed action: back to `fallback` where the queued
/// message is shown, or to the login page if the session ended.
#[must_use]
pub fn bounce(error: HookError, fallback: &str) -> Response {
    match error {
        HookError::SessionExpired => AppError::SessionExpired.into_response(),
        HookError::Reported(_) => Redirect::to(fallback).into_response(),
    }
}

/// Post-login destination; only local paths are honoured.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/clear", post(cart::clear))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout
        .route("/checkout", get(checkout::show).post(checkout::place_order))
        // Order routes
        .nest("/orders", order_routes())
        // Account
        .route("/account", get(account::index))
        // Auth routes
        .nest("/auth", auth_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{StatusCode, header::LOCATION};

    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/orders/42")), "/orders/42");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_recover() {
        assert_eq!(recover(Ok(3)).ok().flatten(), Some(3));
        assert!(matches!(
            recover::<()>(Err(HookError::Reported("x".into()))),
            Ok(None)
        ));
        assert!(matches!(
            recover::<()>(Err(HookError::SessionExpired)),
            Err(AppError::SessionExpired)
        ));
    }

    #[test]
    fn test_bounce() {
        let response = bounce(HookError::Reported("x".into()), "/cart");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/cart");

        let response = bounce(HookError::SessionExpired, "/cart");
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/auth/login?error=session_expired"
        );
    }
}
