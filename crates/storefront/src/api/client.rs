//! Authenticated HTTP client with one-shot token refresh.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::api::tokens::TokenStore;
use crate::api::types::{Category, RefreshTokenBody, TokenRefreshResponse};
use crate::api::ApiError;

/// Path of the token refresh endpoint, relative to the API base.
pub(crate) const REFRESH_PATH: &str = "/accounts/token/refresh/";

const CATEGORY_CACHE_KEY: &str = "all";
const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(300);

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// A request to the backend, kept whole so it can be replayed after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
    refresh_on_unauthorized: bool,
}

impl ApiRequest {
    /// Request with the given method and path relative to the API base.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            refresh_on_unauthorized: true,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter; `None` and blank values are skipped.
    #[must_use]
    pub fn query(mut self, key: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.query.push((key, value.to_owned()));
        }
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Report a `401` as-is instead of refreshing and replaying.
    ///
    /// Used by the requests that establish credentials, where a `401` means
    /// wrong credentials rather than an expired token.
    #[must_use]
    pub const fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Shared client for the shop backend.
///
/// Cheap to clone. Holds no per-visitor state; pair it with a
/// [`TokenStore`] through [`ApiClient::session`] to make calls.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    categories: Cache<&'static str, Vec<Category>>,
}

impl ApiClient {
    /// Create a client for the backend rooted at `base_url` (including `/api`).
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Create a client on top of a preconfigured `reqwest` client.
    #[must_use]
    pub fn with_http_client(base_url: &Url, client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: base_url.as_str().trim_end_matches('/').to_owned(),
                categories: Cache::builder()
                    .max_capacity(1)
                    .time_to_live(CATEGORY_CACHE_TTL)
                    .build(),
            }),
        }
    }

    /// Backend base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Bind the client to one visitor's credentials.
    #[must_use]
    pub fn session<'a>(&'a self, tokens: &'a dyn TokenStore) -> ApiSession<'a> {
        ApiSession {
            client: self,
            tokens,
        }
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Sent without an `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the token.
    #[instrument(skip_all)]
    pub async fn refresh_token(
        &self,
        refresh: &SecretString,
    ) -> Result<TokenRefreshResponse, ApiError> {
        let url = self.endpoint(REFRESH_PATH, &[])?;
        let response = self
            .inner
            .client
            .post(url)
            .json(&RefreshTokenBody {
                refresh: refresh.expose_secret(),
            })
            .send()
            .await?;

        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn cached_categories(&self) -> Option<Vec<Category>> {
        self.inner.categories.get(CATEGORY_CACHE_KEY).await
    }

    pub(crate) async fn cache_categories(&self, categories: Vec<Category>) {
        self.inner
            .categories
            .insert(CATEGORY_CACHE_KEY, categories)
            .await;
    }

    pub(crate) async fn invalidate_categories(&self) {
        self.inner.categories.invalidate(CATEGORY_CACHE_KEY).await;
    }

    fn endpoint(&self, path: &str, query: &[(&'static str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{path}", self.inner.base_url))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&SecretString>,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(&request.path, &request.query)?;
        let mut builder = self.inner.client.request(request.method.clone(), url);

        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            authenticated = token.is_some(),
            "Dispatching API request"
        );

        Ok(builder.send().await?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-visitor session
// ─────────────────────────────────────────────────────────────────────────────

/// The API client bound to one visitor's credentials.
///
/// Attaches `Authorization: Bearer <access>` whenever an access token is
/// stored. A `401` on a refreshable request triggers exactly one refresh and
/// one replay; a `401` on the replay is returned as an error.
#[derive(Clone, Copy)]
pub struct ApiSession<'a> {
    pub(crate) client: &'a ApiClient,
    tokens: &'a dyn TokenStore,
}

impl ApiSession<'_> {
    /// The credential store this session reads and writes.
    #[must_use]
    pub fn tokens(&self) -> &dyn TokenStore {
        self.tokens
    }

    /// Send a request and return the successful response.
    ///
    /// # Errors
    ///
    /// - [`ApiError::SessionExpired`] if the token was rejected and could not
    ///   be refreshed (stored credentials are cleared)
    /// - [`ApiError::Status`] for any other non-success response
    /// - [`ApiError::Http`] if the request could not be sent
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let token = self.tokens.access_token().await?;
        let response = self.client.dispatch(request, token.as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !request.refresh_on_unauthorized {
            return check_status(response).await;
        }

        tracing::debug!("Access token rejected, attempting refresh");
        let access = self.refresh_access_token().await?;

        let replayed = self.client.dispatch(request, Some(&access)).await?;
        check_status(replayed).await
    }

    /// Send a request and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// Same as [`ApiSession::send`], plus [`ApiError::Decode`] if the body
    /// does not match `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request and discard the response body.
    ///
    /// # Errors
    ///
    /// Same as [`ApiSession::send`].
    pub async fn execute(&self, request: &ApiRequest) -> Result<(), ApiError> {
        self.send(request).await?;
        Ok(())
    }

    /// Mint a new access token from the stored refresh token.
    ///
    /// The new token is stored before it is returned. On any failure the
    /// credential triple is cleared and `SessionExpired` is returned.
    async fn refresh_access_token(&self) -> Result<SecretString, ApiError> {
        let Some(refresh) = self.tokens.refresh_token().await? else {
            tracing::warn!("No refresh token stored, ending session");
            self.expire().await;
            return Err(ApiError::SessionExpired);
        };

        let refreshed = match self.client.refresh_token(&refresh).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, ending session");
                self.expire().await;
                return Err(ApiError::SessionExpired);
            }
        };

        if let Err(e) = self.store_refreshed(&refreshed).await {
            tracing::error!(error = %e, "Failed to store refreshed token, ending session");
            self.expire().await;
            return Err(ApiError::SessionExpired);
        }

        tracing::info!(rotated = refreshed.refresh.is_some(), "Access token refreshed");
        Ok(SecretString::from(refreshed.access))
    }

    async fn store_refreshed(&self, refreshed: &TokenRefreshResponse) -> Result<(), ApiError> {
        self.tokens.save_access_token(&refreshed.access).await?;
        if let Some(rotated) = &refreshed.refresh {
            self.tokens.save_refresh_token(rotated).await?;
        }
        Ok(())
    }

    async fn expire(&self) {
        if let Err(e) = self.tokens.clear().await {
            tracing::error!(error = %e, "Failed to clear stored credentials");
        }
    }
}

impl std::fmt::Debug for ApiSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSession")
            .field("client", self.client)
            .finish_non_exhaustive()
    }
}

/// Turn a non-success response into [`ApiError::Status`], keeping a JSON body.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).ok();
    tracing::debug!(%status, "API request rejected");

    Err(ApiError::Status { status, body })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&Url::parse(base).unwrap())
    }

    #[test]
    fn test_endpoint_joins_base_path() {
        let api = client("http://backend.test/api/");
        let url = api.endpoint("/orders/cart/my_cart/", &[]).unwrap();
        assert_eq!(url.as_str(), "http://backend.test/api/orders/cart/my_cart/");
    }

    #[test]
    fn test_endpoint_encodes_query() {
        let api = client("http://backend.test/api");
        let request = ApiRequest::get("/products/products/search/")
            .query("q", Some("green tea & co"))
            .query("category_id", None)
            .query("page", Some("  "));
        let url = api.endpoint(request.path(), &request.query).unwrap();
        assert_eq!(
            url.as_str(),
            "http://backend.test/api/products/products/search/?q=green+tea+%26+co"
        );
    }

    #[test]
    fn test_request_builder_defaults() {
        let request = ApiRequest::post("/accounts/login/");
        assert_eq!(request.method(), &Method::POST);
        assert!(request.refresh_on_unauthorized);
        assert!(!request.without_refresh().refresh_on_unauthorized);
    }

    #[tokio::test]
    async fn test_category_cache() {
        let api = client("http://backend.test/api");
        assert!(api.cached_categories().await.is_none());

        api.cache_categories(Vec::new()).await;
        assert_eq!(api.cached_categories().await, Some(Vec::new()));

        api.invalidate_categories().await;
        assert!(api.cached_categories().await.is_none());
    }
}
