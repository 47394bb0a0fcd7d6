//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use bazaar_core::ProductId;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{Category, Product, ProductFilter};
use crate::error::Result;
use crate::filters;
use crate::routes::{PageContext, bounce, recover};
use crate::services::products;
use crate::state::AppState;

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub search: String,
    pub category: String,
}

impl ProductsIndexTemplate {
    /// Whether `category` is the selected filter.
    #[must_use]
    pub fn is_selected(&self, category: &Category) -> bool {
        self.category == category.id.as_str()
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub ctx: PageContext,
    pub product: Product,
}

/// Display product listing page.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ProductFilter>,
) -> Result<ProductsIndexTemplate> {
    let categories = recover(products::categories(state.api(), &session).await)?;
    let listing = recover(products::catalog(state.api(), &session, &filter, None).await)?;

    Ok(ProductsIndexTemplate {
        ctx: PageContext::load(&session).await,
        products: listing.unwrap_or_default(),
        categories: categories.unwrap_or_default(),
        search: filter.search_term().unwrap_or_default().to_owned(),
        category: filter.category_id().unwrap_or_default().to_owned(),
    })
}

/// Display product detail page.
///
/// An unknown product sends the visitor back to the listing.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    match products::product(state.api(), &session, &ProductId::new(id)).await {
        Ok(product) => ProductShowTemplate {
            ctx: PageContext::load(&session).await,
            product,
        }
        .into_response(),
        Err(e) => bounce(e, "/products"),
    }
}
