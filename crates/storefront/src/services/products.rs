//! Catalog hooks.

use futures::future::join_all;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::api::{ApiClient, ApiError, Category, Product, ProductFilter, SessionTokenStore};
use crate::services::{HookResult, report, settle};

/// Active products matching the filter, each with its image list.
///
/// With a `limit`, the listing is cut before any image is requested. Images
/// are fetched per product, concurrently. A failed image fetch keeps whatever
/// images the listing already carried.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the search itself fails.
#[instrument(skip(api, session))]
pub async fn catalog(
    api: &ApiClient,
    session: &Session,
    filter: &ProductFilter,
    limit: Option<usize>,
) -> HookResult<Vec<Product>> {
    let tokens = SessionTokenStore::new(session.clone());
    let api = api.session(&tokens);

    let mut products = settle(
        session,
        api.search_products(filter.search_term(), filter.category_id())
            .await,
        "Could not load products",
    )
    .await?;

    if let Some(limit) = limit {
        products.truncate(limit);
    }

    let images = join_all(products.iter().map(|p| api.product_images(&p.id))).await;

    for (product, images) in products.iter_mut().zip(images) {
        match images {
            Ok(images) => product.images = images,
            Err(ApiError::SessionExpired) => {
                return Err(report(session, &ApiError::SessionExpired, "").await);
            }
            Err(e) => {
                tracing::warn!(product_id = %product.id, error = %e, "Failed to load product images");
            }
        }
    }

    Ok(products)
}

/// A single product.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the product cannot be loaded.
#[instrument(skip(api, session, id), fields(product_id = %id))]
pub async fn product(api: &ApiClient, session: &Session, id: &ProductId) -> HookResult<Product> {
    let tokens = SessionTokenStore::new(session.clone());
    settle(
        session,
        api.session(&tokens).product(id).await,
        "Could not load product",
    )
    .await
}

/// All categories.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the categories cannot be loaded.
#[instrument(skip(api, session))]
pub async fn categories(api: &ApiClient, session: &Session) -> HookResult<Vec<Category>> {
    let tokens = SessionTokenStore::new(session.clone());
    settle(
        session,
        api.session(&tokens).categories().await,
        "Could not load categories",
    )
    .await
}
