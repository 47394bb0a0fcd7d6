//! Authentication route handlers.
//!
//! Login and registration post to the shop backend; the returned tokens are
//! kept in the visitor's session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::routes::{PageContext, bounce, safe_next};
use crate::services::{HookError, accounts};
use crate::services::validation::{LoginForm, RegistrationForm};
use crate::state::AppState;

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub next: Option<String>,
}

/// Text for an `?error=` code, shown when no notification explains it.
fn error_notice(code: Option<&str>) -> Option<&'static str> {
    match code? {
        "session_expired" => Some(crate::services::SESSION_EXPIRED_MESSAGE),
        _ => None,
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub notice: Option<&'static str>,
    pub username: String,
    pub next: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub form: RegistrationForm,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
///
/// Signed-in visitors are sent on to `next` (or home).
#[instrument(skip(session))]
pub async fn login_page(session: Session, Query(query): Query<LoginQuery>) -> Response {
    // Checked before loading the page so queued flashes survive the redirect
    if accounts::auth_status(&session).await.is_authenticated {
        return Redirect::to(safe_next(query.next.as_deref())).into_response();
    }

    let ctx = PageContext::load(&session).await;
    let notice = if ctx.flashes.is_empty() {
        error_notice(query.error.as_deref())
    } else {
        None
    };

    LoginTemplate {
        ctx,
        notice,
        username: String::new(),
        next: query.next,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match accounts::login(state.api(), &session, &form).await {
        Ok(_) => Redirect::to(safe_next(form.next.as_deref())).into_response(),
        Err(e @ HookError::SessionExpired) => bounce(e, "/auth/login"),
        Err(HookError::Reported(_)) => {
            let page = LoginTemplate {
                ctx: PageContext::load(&session).await,
                notice: None,
                username: form.username,
                next: form.next,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(session))]
pub async fn register_page(session: Session) -> Response {
    if accounts::auth_status(&session).await.is_authenticated {
        return Redirect::to("/").into_response();
    }

    RegisterTemplate {
        ctx: PageContext::load(&session).await,
        form: RegistrationForm::default(),
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegistrationForm>,
) -> Response {
    match accounts::register(state.api(), &session, &form).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e @ HookError::SessionExpired) => bounce(e, "/auth/register"),
        Err(HookError::Reported(_)) => {
            // Never echo passwords back into the page
            let form = RegistrationForm {
                password: String::new(),
                password_confirm: String::new(),
                ..form
            };
            let page = RegisterTemplate {
                ctx: PageContext::load(&session).await,
                form,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Always ends the local session, even if the backend call fails.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    accounts::logout(state.api(), &session).await;
    Redirect::to("/auth/login")
}
