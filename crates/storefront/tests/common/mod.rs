//! In-process stand-in for the shop backend.
//!
//! Serves canned JSON on an ephemeral port, keeps a little cart and order
//! state, and logs every request it receives so tests can assert which
//! endpoints the storefront hit.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use url::Url;

pub const VALID_ACCESS: &str = "access-valid";
pub const STALE_ACCESS: &str = "access-stale";
pub const VALID_REFRESH: &str = "refresh-valid";
pub const ROTATED_REFRESH: &str = "refresh-rotated";
/// Accepted by the refresh endpoint, which then answers without a new refresh token.
pub const NON_ROTATING_REFRESH: &str = "refresh-non-rotating";
pub const REVOKED_REFRESH: &str = "refresh-revoked";
pub const PASSWORD: &str = "correct-horse";
pub const ORDER_ID: &str = "o-1";

/// Per-endpoint call counters.
#[derive(Debug, Default)]
pub struct Calls {
    pub login: AtomicUsize,
    pub refresh: AtomicUsize,
    pub profile: AtomicUsize,
    pub cart: AtomicUsize,
    pub categories: AtomicUsize,
    pub images: AtomicUsize,
    pub always_unauthorized: AtomicUsize,
}

/// Handle on a running mock backend.
#[derive(Debug, Clone)]
pub struct Backend {
    pub calls: Arc<Calls>,
    authorizations: Arc<Mutex<Vec<Option<String>>>>,
    requests: Arc<Mutex<Vec<String>>>,
    /// Access and refresh token the next login hands out.
    issued: Arc<Mutex<(String, String)>>,
    /// Number of products the search endpoint returns.
    catalog_size: Arc<AtomicUsize>,
    /// Quantity of the single cart line; zero means an empty cart.
    cart_quantity: Arc<AtomicU32>,
    order_cancelled: Arc<AtomicBool>,
    last_body: Arc<Mutex<Option<Value>>>,
}

impl Backend {
    /// Start a backend and return it with its API base URL (`.../api/`).
    pub async fn spawn() -> (Self, Url) {
        let backend = Self {
            calls: Arc::default(),
            authorizations: Arc::default(),
            requests: Arc::default(),
            issued: Arc::new(Mutex::new((VALID_ACCESS.to_owned(), VALID_REFRESH.to_owned()))),
            catalog_size: Arc::new(AtomicUsize::new(2)),
            cart_quantity: Arc::new(AtomicU32::new(2)),
            order_cancelled: Arc::default(),
            last_body: Arc::default(),
        };

        let router = Router::new()
            .route("/api/accounts/login/", post(login))
            .route("/api/accounts/register/", post(register))
            .route("/api/accounts/logout/", post(logout))
            .route("/api/accounts/token/refresh/", post(refresh))
            .route("/api/accounts/users/me/", get(profile))
            .route("/api/orders/cart/my_cart/", get(my_cart))
            .route("/api/orders/cart/add_item/", post(add_item))
            .route("/api/orders/cart/update_item/", post(update_item))
            .route("/api/orders/cart/clear/", axum::routing::delete(clear_cart))
            .route("/api/orders/orders/", get(orders))
            .route("/api/orders/orders/create_from_cart/", post(create_order))
            .route("/api/orders/orders/{id}/", get(order))
            .route("/api/orders/orders/{id}/cancel/", post(cancel_order))
            .route("/api/products/categories/", get(categories).post(create_category))
            .route(
                "/api/products/categories/{id}/",
                get(category).patch(update_category).delete(no_content),
            )
            .route("/api/products/products/", get(list_products).post(create_product))
            .route("/api/products/products/search/", get(search))
            .route(
                "/api/products/products/{id}/",
                get(product).patch(update_product).delete(no_content),
            )
            .route("/api/products/products/{id}/images/", get(product_images))
            .route("/api/always-unauthorized/", get(always_unauthorized))
            .layer(middleware::from_fn_with_state(backend.clone(), log_request))
            .with_state(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        (backend, Url::parse(&format!("http://{addr}/api/")).unwrap())
    }

    /// Value of a call counter.
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the most recent authenticated-endpoint call.
    pub async fn last_authorization(&self) -> Option<String> {
        self.authorizations.lock().await.last().cloned().flatten()
    }

    /// Every request received so far, as `"METHOD /path?query"`.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }

    /// Whether a request line was received.
    pub async fn received(&self, line: &str) -> bool {
        self.requests.lock().await.iter().any(|r| r == line)
    }

    /// JSON body of the most recent cart or order write.
    pub async fn last_body(&self) -> Option<Value> {
        self.last_body.lock().await.clone()
    }

    /// Tokens handed out by later logins.
    pub async fn issue_tokens(&self, access: &str, refresh: &str) {
        *self.issued.lock().await = (access.to_owned(), refresh.to_owned());
    }

    /// Number of products the search endpoint returns from now on.
    pub fn set_catalog_size(&self, size: usize) {
        self.catalog_size.store(size, Ordering::SeqCst);
    }

    async fn record(&self, headers: &HeaderMap) -> bool {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let expected = format!("Bearer {VALID_ACCESS}");
        let authorized = header.as_deref() == Some(expected.as_str());
        self.authorizations.lock().await.push(header);
        authorized
    }

    async fn remember(&self, body: Value) {
        *self.last_body.lock().await = Some(body);
    }

    fn cart_json(&self) -> Value {
        let quantity = self.cart_quantity.load(Ordering::SeqCst);
        let items = if quantity == 0 {
            json!([])
        } else {
            json!([{ "id": "ci-1", "product": product_json("p-1"), "quantity": quantity }])
        };
        json!({ "id": "cart-1", "items": items, "total_items": quantity })
    }

    fn order_json(&self) -> Value {
        let status = if self.order_cancelled.load(Ordering::SeqCst) {
            "cancelled"
        } else {
            "pending"
        };
        json!({
            "id": ORDER_ID,
            "username": "linh",
            "order_number": "ORD-1001",
            "items": [{
                "id": "oi-1",
                "product": product_json("p-1"),
                "quantity": 2,
                "unit_price": "129000.00",
                "subtotal": "258000.00"
            }],
            "total_amount": "258000.00",
            "status": status,
            "shipping_address": "12 Le Loi, District 1",
            "created_at": "2026-10-01T09:30:00Z"
        })
    }
}

async fn log_request(State(backend): State<Backend>, request: Request, next: Next) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_owned(), |pq| pq.as_str().to_owned());
    backend
        .requests
        .lock()
        .await
        .push(format!("{} {target}", request.method()));
    next.run(request).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

pub fn user_json(username: &str) -> Value {
    json!({
        "id": "7d4c7a52-3b8e-4a55-9d1b-0f5a2e8c9b10",
        "username": username,
        "email": format!("{username}@shop.test"),
        "phone_number": "0912345678",
        "full_name": "Linh Tran",
        "is_staff": false,
        "is_superuser": false
    })
}

pub fn category_json() -> Value {
    json!({ "id": "c-tea", "name": "Tea", "description": "Loose leaf tea" })
}

pub fn product_json(id: &str) -> Value {
    json!({
        "id": id,
        "category": category_json(),
        "name": "Green Tea",
        "description": "Steamed sencha",
        "price": "129000.00",
        "stock": 12,
        "is_active": true,
        "images": []
    })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid"
        })),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    backend.calls.login.fetch_add(1, Ordering::SeqCst);

    if body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "No active account found with the given credentials" })),
        )
            .into_response();
    }

    let (access, refresh) = backend.issued.lock().await.clone();
    let username = body["username"].as_str().unwrap_or_default();
    Json(json!({
        "user": user_json(username),
        "access": access,
        "refresh": refresh
    }))
    .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    if username == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "username": ["A user with that username already exists."] })),
        )
            .into_response();
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "user": user_json(username),
            "access": VALID_ACCESS,
            "refresh": VALID_REFRESH
        })),
    )
        .into_response()
}

async fn logout() -> Response {
    Json(json!({ "detail": "Successfully logged out" })).into_response()
}

async fn refresh(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    backend.calls.refresh.fetch_add(1, Ordering::SeqCst);

    if body["refresh"] == VALID_REFRESH {
        Json(json!({ "access": VALID_ACCESS, "refresh": ROTATED_REFRESH })).into_response()
    } else if body["refresh"] == NON_ROTATING_REFRESH {
        Json(json!({ "access": VALID_ACCESS })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired" })),
        )
            .into_response()
    }
}

async fn profile(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.calls.profile.fetch_add(1, Ordering::SeqCst);
    if !backend.record(&headers).await {
        return unauthorized();
    }
    Json(user_json("linh")).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Cart & Orders
// ─────────────────────────────────────────────────────────────────────────────

async fn my_cart(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.calls.cart.fetch_add(1, Ordering::SeqCst);
    if !backend.record(&headers).await {
        return unauthorized();
    }
    Json(backend.cart_json()).into_response()
}

async fn add_item(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !backend.record(&headers).await {
        return unauthorized();
    }
    let quantity = u32::try_from(body["quantity"].as_u64().unwrap_or_default()).unwrap();
    backend.cart_quantity.fetch_add(quantity, Ordering::SeqCst);
    backend.remember(body).await;
    Json(backend.cart_json()).into_response()
}

async fn update_item(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !backend.record(&headers).await {
        return unauthorized();
    }
    let quantity = u32::try_from(body["quantity"].as_u64().unwrap_or_default()).unwrap();
    backend.cart_quantity.store(quantity, Ordering::SeqCst);
    backend.remember(body).await;
    Json(backend.cart_json()).into_response()
}

async fn clear_cart(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !backend.record(&headers).await {
        return unauthorized();
    }
    backend.cart_quantity.store(0, Ordering::SeqCst);
    StatusCode::NO_CONTENT.into_response()
}

async fn orders(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !backend.record(&headers).await {
        return unauthorized();
    }
    Json(json!([backend.order_json()])).into_response()
}

async fn order(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !backend.record(&headers).await {
        return unauthorized();
    }
    if id != ORDER_ID {
        return not_found();
    }
    Json(backend.order_json()).into_response()
}

async fn create_order(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !backend.record(&headers).await {
        return unauthorized();
    }
    backend.cart_quantity.store(0, Ordering::SeqCst);
    backend.remember(body).await;
    (StatusCode::CREATED, Json(backend.order_json())).into_response()
}

async fn cancel_order(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !backend.record(&headers).await {
        return unauthorized();
    }
    if id != ORDER_ID {
        return not_found();
    }
    if backend.order_cancelled.swap(true, Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Order cannot be cancelled" })),
        )
            .into_response();
    }
    Json(backend.order_json()).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

async fn categories(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.calls.categories.fetch_add(1, Ordering::SeqCst);
    backend.record(&headers).await;
    Json(json!([category_json()])).into_response()
}

async fn category(Path(id): Path<String>) -> Response {
    Json(json!({ "id": id, "name": "Tea", "description": "Loose leaf tea" })).into_response()
}

async fn create_category(Json(body): Json<Value>) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "c-new",
            "name": body["name"],
            "description": body["description"]
        })),
    )
        .into_response()
}

async fn update_category(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    Json(json!({ "id": id, "name": body["name"], "description": body["description"] }))
        .into_response()
}

async fn list_products() -> Response {
    Json(json!([product_json("p-1")])).into_response()
}

async fn create_product(Json(body): Json<Value>) -> Response {
    let mut product = product_json("p-new");
    product["name"] = body["name"].clone();
    (StatusCode::CREATED, Json(product)).into_response()
}

async fn update_product(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    let mut product = product_json(&id);
    if let Some(name) = body.get("name") {
        product["name"] = name.clone();
    }
    Json(product).into_response()
}

async fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn search(State(backend): State<Backend>) -> Response {
    let size = backend.catalog_size.load(Ordering::SeqCst);
    let products: Vec<Value> = (1..=size).map(|n| product_json(&format!("p-{n}"))).collect();
    Json(Value::Array(products)).into_response()
}

async fn product(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found();
    }
    Json(product_json(&id)).into_response()
}

async fn product_images(State(backend): State<Backend>) -> Response {
    backend.calls.images.fetch_add(1, Ordering::SeqCst);
    Json(json!([])).into_response()
}

async fn always_unauthorized(State(backend): State<Backend>) -> Response {
    backend
        .calls
        .always_unauthorized
        .fetch_add(1, Ordering::SeqCst);
    unauthorized()
}
