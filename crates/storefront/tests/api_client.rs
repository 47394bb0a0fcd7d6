//! Integration tests for the authenticated API client.
//!
//! Each test runs against its own mock backend, so call counters and the
//! category cache start fresh.

#![allow(clippy::unwrap_used)]

mod common;

use bazaar_core::{CategoryId, Price, ProductId};
use bazaar_storefront::api::{
    ApiClient, ApiError, ApiRequest, CategoryInput, CreateProduct, LoginRequest,
    MemoryTokenStore, ProductFilter, ProductUpdate, RegisterRequest, TokenStore,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;

use common::{
    Backend, NON_ROTATING_REFRESH, PASSWORD, REVOKED_REFRESH, ROTATED_REFRESH, STALE_ACCESS,
    VALID_ACCESS, VALID_REFRESH,
};

async fn stored_access(store: &MemoryTokenStore) -> Option<String> {
    store
        .access_token()
        .await
        .unwrap()
        .map(|token| token.expose_secret().to_owned())
}

async fn stored_refresh(store: &MemoryTokenStore) -> Option<String> {
    store
        .refresh_token()
        .await
        .unwrap()
        .map(|token| token.expose_secret().to_owned())
}

// =============================================================================
// Authorization Header
// =============================================================================

#[tokio::test]
async fn test_stored_access_token_sent_as_bearer() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(VALID_ACCESS), Some(VALID_REFRESH));

    let cart = api.session(&store).my_cart().await.unwrap();

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_items, 2);
    assert_eq!(
        backend.last_authorization().await.as_deref(),
        Some("Bearer access-valid")
    );
    assert_eq!(Backend::count(&backend.calls.refresh), 0);
}

#[tokio::test]
async fn test_anonymous_request_has_no_authorization() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::new();

    let categories = api.session(&store).categories().await.unwrap();

    assert_eq!(categories.len(), 1);
    assert_eq!(backend.last_authorization().await, None);
}

// =============================================================================
// Refresh & Replay
// =============================================================================

#[tokio::test]
async fn test_unauthorized_refreshes_once_and_replays() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(STALE_ACCESS), Some(VALID_REFRESH));

    let cart = api.session(&store).my_cart().await.unwrap();

    assert_eq!(cart.total_items, 2);
    assert_eq!(Backend::count(&backend.calls.cart), 2);
    assert_eq!(Backend::count(&backend.calls.refresh), 1);
    assert_eq!(stored_access(&store).await.as_deref(), Some(VALID_ACCESS));
    assert_eq!(stored_refresh(&store).await.as_deref(), Some(ROTATED_REFRESH));
}

#[tokio::test]
async fn test_refresh_without_rotation_keeps_refresh_token() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(STALE_ACCESS), Some(NON_ROTATING_REFRESH));

    api.session(&store).my_cart().await.unwrap();

    assert_eq!(Backend::count(&backend.calls.refresh), 1);
    assert_eq!(stored_access(&store).await.as_deref(), Some(VALID_ACCESS));
    assert_eq!(
        stored_refresh(&store).await.as_deref(),
        Some(NON_ROTATING_REFRESH)
    );
}

#[tokio::test]
async fn test_second_unauthorized_is_not_retried() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(VALID_ACCESS), Some(VALID_REFRESH));

    let err = api
        .session(&store)
        .send(&ApiRequest::get("/always-unauthorized/"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert!(!err.is_session_expired());
    assert_eq!(Backend::count(&backend.calls.always_unauthorized), 2);
    assert_eq!(Backend::count(&backend.calls.refresh), 1);
    // The refresh itself succeeded, so the credentials stay.
    assert!(!store.is_empty().await);
}

#[tokio::test]
async fn test_rejected_refresh_clears_credentials() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(STALE_ACCESS), Some(REVOKED_REFRESH));

    let err = api.session(&store).my_cart().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(store.is_empty().await);
    assert_eq!(Backend::count(&backend.calls.cart), 1);
    assert_eq!(Backend::count(&backend.calls.refresh), 1);
}

#[tokio::test]
async fn test_missing_refresh_token_clears_without_calling_backend() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(STALE_ACCESS), None);

    let err = api.session(&store).profile().await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(store.is_empty().await);
    assert_eq!(Backend::count(&backend.calls.refresh), 0);
}

// =============================================================================
// Error Pass-through
// =============================================================================

#[tokio::test]
async fn test_non_unauthorized_errors_pass_through() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(VALID_ACCESS), Some(VALID_REFRESH));

    let err = api
        .session(&store)
        .product(&ProductId::new("missing"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.backend_message().as_deref(), Some("Not found."));
    assert_eq!(Backend::count(&backend.calls.refresh), 0);
    assert_eq!(stored_access(&store).await.as_deref(), Some(VALID_ACCESS));
}

// =============================================================================
// Credential Endpoints
// =============================================================================

#[tokio::test]
async fn test_login_returns_credential_triple() {
    let (_backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::new();

    let auth = api
        .session(&store)
        .login(&LoginRequest {
            username: "linh".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();

    assert_eq!(auth.user.username, "linh");
    assert_eq!(auth.access, VALID_ACCESS);
    assert_eq!(auth.refresh, VALID_REFRESH);

    store.save_credentials(&auth).await.unwrap();
    assert_eq!(stored_access(&store).await.as_deref(), Some(VALID_ACCESS));
    assert_eq!(stored_refresh(&store).await.as_deref(), Some(VALID_REFRESH));
    assert_eq!(store.user().await.unwrap(), Some(auth.user));
}

#[tokio::test]
async fn test_wrong_password_does_not_trigger_refresh() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(STALE_ACCESS), Some(VALID_REFRESH));

    let err = api
        .session(&store)
        .login(&LoginRequest {
            username: "linh".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(
        err.backend_message().as_deref(),
        Some("No active account found with the given credentials")
    );
    assert_eq!(Backend::count(&backend.calls.login), 1);
    assert_eq!(Backend::count(&backend.calls.refresh), 0);
    assert!(!store.is_empty().await);
}

#[tokio::test]
async fn test_register_field_error_message() {
    let (_backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::new();

    let err = api
        .session(&store)
        .register(&RegisterRequest {
            username: "taken".to_string(),
            password: PASSWORD.to_string(),
            password_confirm: PASSWORD.to_string(),
            full_name: "Linh Tran".to_string(),
            email: "linh@shop.test".to_string(),
            phone_number: "0912345678".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(
        err.backend_message().as_deref(),
        Some("A user with that username already exists.")
    );
}

// =============================================================================
// Category Cache
// =============================================================================

#[tokio::test]
async fn test_categories_served_from_cache_until_changed() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(VALID_ACCESS), Some(VALID_REFRESH));
    let session = api.session(&store);

    session.categories().await.unwrap();
    session.categories().await.unwrap();
    assert_eq!(Backend::count(&backend.calls.categories), 1);

    let created = session
        .create_category(&CategoryInput {
            name: "Coffee".to_string(),
            description: "Whole beans".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(created.name, "Coffee");

    session.categories().await.unwrap();
    assert_eq!(Backend::count(&backend.calls.categories), 2);
}

#[tokio::test]
async fn test_category_update_and_delete_invalidate_cache() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(VALID_ACCESS), Some(VALID_REFRESH));
    let session = api.session(&store);
    let id = CategoryId::new("c-tea");

    let category = session.category(&id).await.unwrap();
    assert_eq!(category.id, id);

    session.categories().await.unwrap();
    let updated = session
        .update_category(
            &id,
            &CategoryInput {
                name: "Green tea".to_string(),
                description: "Unoxidised".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Green tea");

    session.categories().await.unwrap();
    session.delete_category(&id).await.unwrap();
    session.categories().await.unwrap();

    assert_eq!(Backend::count(&backend.calls.categories), 3);
    assert_eq!(
        backend.requests().await,
        vec![
            "GET /api/products/categories/c-tea/",
            "GET /api/products/categories/",
            "PATCH /api/products/categories/c-tea/",
            "GET /api/products/categories/",
            "DELETE /api/products/categories/c-tea/",
            "GET /api/products/categories/",
        ]
    );
}

// =============================================================================
// Product Endpoints
// =============================================================================

#[tokio::test]
async fn test_product_endpoints_use_expected_routes() {
    let (backend, url) = Backend::spawn().await;
    let api = ApiClient::new(&url);
    let store = MemoryTokenStore::with_tokens(Some(VALID_ACCESS), Some(VALID_REFRESH));
    let session = api.session(&store);
    let id = ProductId::new("p-7");

    let listed = session
        .products(&ProductFilter {
            category: Some("c-tea".to_string()),
            search: Some(" sencha ".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let created = session
        .create_product(&CreateProduct {
            category_id: CategoryId::new("c-tea"),
            name: "Oolong".to_string(),
            description: String::new(),
            price: Price::new(Decimal::new(99_000, 0)),
            stock_quantity: 5,
            is_active: true,
        })
        .await
        .unwrap();
    assert_eq!(created.name, "Oolong");

    let updated = session
        .update_product(
            &id,
            &ProductUpdate {
                name: Some("Sencha".to_string()),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.id, id);
    assert_eq!(updated.name, "Sencha");

    session.delete_product(&id).await.unwrap();

    assert_eq!(
        backend.requests().await,
        vec![
            "GET /api/products/products/?category=c-tea&search=sencha",
            "POST /api/products/products/",
            "PATCH /api/products/products/p-7/",
            "DELETE /api/products/products/p-7/",
        ]
    );
}
