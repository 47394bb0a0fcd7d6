//! Sign-in, registration and sign-out.

use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ApiClient, AuthResponse, SessionTokenStore, TokenStore, User};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::Flash;
use crate::services::validation::{LoginForm, RegistrationForm};
use crate::services::{HookError, HookResult, notifications, reject, settle};

/// Whether the visitor is signed in, and as whom.
#[derive(Debug, Clone, Default)]
pub struct AuthStatus {
    /// `true` iff an access token is stored.
    pub is_authenticated: bool,
    /// User cached at sign-in.
    pub user: Option<User>,
}

/// Read the visitor's sign-in state from the session.
///
/// Makes no backend call; a stored access token may already be expired.
pub async fn auth_status(session: &Session) -> AuthStatus {
    let tokens = SessionTokenStore::new(session.clone());

    let is_authenticated = match tokens.access_token().await {
        Ok(token) => token.is_some(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read access token");
            false
        }
    };
    if !is_authenticated {
        return AuthStatus::default();
    }

    let user = tokens.user().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read cached user");
        None
    });

    AuthStatus {
        is_authenticated,
        user,
    }
}

/// Sign in and store the credential triple.
///
/// # Errors
///
/// Returns [`HookError::Reported`] if the form is incomplete or the backend
/// rejects the credentials.
#[instrument(skip(api, session, form), fields(username = %form.username))]
pub async fn login(api: &ApiClient, session: &Session, form: &LoginForm) -> HookResult<User> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => return Err(reject(session, &e).await),
    };

    let tokens = SessionTokenStore::new(session.clone());
    let auth = settle(
        session,
        api.session(&tokens).login(&request).await,
        "Login failed",
    )
    .await?;

    establish(session, &tokens, &auth, "Login failed").await?;
    notifications::push(
        session,
        Flash::success(format!("Welcome, {}!", auth.user.username)),
    )
    .await;

    tracing::info!(user_id = %auth.user.id, "User logged in");
    Ok(auth.user)
}

/// Create an account and sign it in.
///
/// # Errors
///
/// Returns [`HookError::Reported`] if the form is invalid or the backend
/// rejects the registration (e.g. the username is taken).
#[instrument(skip(api, session, form), fields(username = %form.username))]
pub async fn register(
    api: &ApiClient,
    session: &Session,
    form: &RegistrationForm,
) -> HookResult<User> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => return Err(reject(session, &e).await),
    };

    let tokens = SessionTokenStore::new(session.clone());
    let auth = settle(
        session,
        api.session(&tokens).register(&request).await,
        "Registration failed",
    )
    .await?;

    establish(session, &tokens, &auth, "Registration failed").await?;
    notifications::push(session, Flash::success("Registration successful!")).await;

    tracing::info!(user_id = %auth.user.id, "User registered");
    Ok(auth.user)
}

/// Sign out.
///
/// The backend is asked to revoke the refresh token, but local credentials
/// are cleared whether or not that succeeds.
#[instrument(skip(api, session))]
pub async fn logout(api: &ApiClient, session: &Session) {
    let tokens = SessionTokenStore::new(session.clone());

    match tokens.refresh_token().await {
        Ok(Some(refresh)) => {
            if let Err(e) = api.session(&tokens).logout(&refresh).await {
                tracing::warn!(error = %e, "Logout request failed");
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read refresh token"),
    }

    if let Err(e) = tokens.clear().await {
        tracing::error!(error = %e, "Failed to clear credentials");
    }
    clear_sentry_user();

    notifications::push(session, Flash::success("You have been logged out")).await;
    tracing::info!("User logged out");
}

/// Fetch the signed-in user's profile from the backend.
///
/// # Errors
///
/// Returns [`HookError::SessionExpired`] if the session could not be
/// refreshed, or [`HookError::Reported`] on any other failure.
#[instrument(skip(api, session))]
pub async fn profile(api: &ApiClient, session: &Session) -> HookResult<User> {
    let tokens = SessionTokenStore::new(session.clone());
    settle(
        session,
        api.session(&tokens).profile().await,
        "Could not load your profile",
    )
    .await
}

/// Store a fresh credential triple under a new session ID.
async fn establish(
    session: &Session,
    tokens: &SessionTokenStore,
    auth: &AuthResponse,
    fallback: &str,
) -> HookResult<()> {
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to rotate session ID");
    }

    if let Err(e) = tokens.save_credentials(auth).await {
        tracing::error!(error = %e, "Failed to store credentials");
        notifications::push(session, Flash::error(fallback)).await;
        return Err(HookError::Reported(fallback.to_owned()));
    }

    set_sentry_user(&auth.user.id, Some(auth.user.email.as_str()));
    Ok(())
}
