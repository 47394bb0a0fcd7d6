//! Account endpoints.

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crate::api::types::{AuthResponse, LoginRequest, RefreshTokenBody, RegisterRequest, User};
use crate::api::{ApiError, ApiRequest, ApiSession};

impl ApiSession<'_> {
    /// Sign in with a username and password.
    ///
    /// A `401` here is a wrong password, not an expired token, so it is
    /// returned as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the credentials.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post("/accounts/login/")
            .json(request)?
            .without_refresh();
        self.fetch(&request).await
    }

    /// Create an account; the response signs the new user in.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post("/accounts/register/")
            .json(request)?
            .without_refresh();
        self.fetch(&request).await
    }

    /// Blacklist the refresh token on the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh: &SecretString) -> Result<(), ApiError> {
        let request = ApiRequest::post("/accounts/logout/").json(&RefreshTokenBody {
            refresh: refresh.expose_secret(),
        })?;
        self.execute(&request).await
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session has expired.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<User, ApiError> {
        self.fetch(&ApiRequest::get("/accounts/users/me/")).await
    }
}
