//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::User;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::{PageContext, recover};
use crate::services::accounts;
use crate::state::AppState;

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub ctx: PageContext,
    pub profile: Option<User>,
}

/// Display the signed-in user's profile.
///
/// Falls back to the user cached at sign-in when the profile endpoint fails.
#[instrument(skip(state, session, cached))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(cached): RequireAuth,
    session: Session,
) -> Result<AccountIndexTemplate> {
    let profile = recover(accounts::profile(state.api(), &session).await)?.or(cached);

    Ok(AccountIndexTemplate {
        ctx: PageContext::load(&session).await,
        profile,
    })
}
