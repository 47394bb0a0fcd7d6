//! Cart route handlers.
//!
//! Every cart route requires a signed-in visitor: the cart lives on the
//! backend and is tied to the account.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::{CartItemId, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::Cart;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::{PageContext, bounce, recover};
use crate::services::orders;
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: CartItemId,
    pub quantity: u32,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub cart: Option<Cart>,
}

/// Display cart page.
#[instrument(skip(state, session, _auth))]
pub async fn show(
    State(state): State<AppState>,
    _auth: RequireAuth,
    session: Session,
) -> Result<CartShowTemplate> {
    let cart = recover(orders::cart(state.api(), &session).await)?;

    Ok(CartShowTemplate {
        ctx: PageContext::load(&session).await,
        cart,
    })
}

/// Add a product to the cart, then return to the product page.
#[instrument(skip(state, session, _auth))]
pub async fn add(
    State(state): State<AppState>,
    _auth: RequireAuth,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let back = format!("/products/{}", urlencoding::encode(form.product_id.as_str()));
    let quantity = form.quantity.unwrap_or(1);

    match orders::add_to_cart(state.api(), &session, &form.product_id, quantity).await {
        Ok(_) => Redirect::to(&back).into_response(),
        Err(e) => bounce(e, &back),
    }
}

/// Update a cart line's quantity; zero removes it.
#[instrument(skip(state, session, _auth))]
pub async fn update(
    State(state): State<AppState>,
    _auth: RequireAuth,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    match orders::update_cart_item(state.api(), &session, &form.item_id, form.quantity).await {
        Ok(_) => Redirect::to("/cart").into_response(),
        Err(e) => bounce(e, "/cart"),
    }
}

/// Empty the cart.
#[instrument(skip(state, session, _auth))]
pub async fn clear(
    State(state): State<AppState>,
    _auth: RequireAuth,
    session: Session,
) -> Response {
    match orders::clear_cart(state.api(), &session).await {
        Ok(()) => Redirect::to("/cart").into_response(),
        Err(e) => bounce(e, "/cart"),
    }
}
