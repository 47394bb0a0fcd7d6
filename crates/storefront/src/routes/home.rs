//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{Category, Product, ProductFilter};
use crate::error::Result;
use crate::filters;
use crate::routes::{PageContext, recover};
use crate::services::products;
use crate::state::AppState;

/// Number of products shown on the home page.
const FEATURED_PRODUCT_COUNT: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub categories: Vec<Category>,
    pub featured: Vec<Product>,
}

/// Display the home page: categories and the newest products.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<HomeTemplate> {
    let categories = recover(products::categories(state.api(), &session).await)?;
    let featured = recover(
        products::catalog(
            state.api(),
            &session,
            &ProductFilter::default(),
            Some(FEATURED_PRODUCT_COUNT),
        )
        .await,
    )?
    .unwrap_or_default();

    Ok(HomeTemplate {
        ctx: PageContext::load(&session).await,
        categories: categories.unwrap_or_default(),
        featured,
    })
}
