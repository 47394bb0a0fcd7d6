//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::Cart;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::{PageContext, bounce};
use crate::services::validation::CheckoutForm;
use crate::services::{notifications, orders};
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: Cart,
}

/// Display the checkout page.
///
/// An empty cart cannot be checked out; the visitor is sent back to it.
#[instrument(skip(state, session, _auth))]
pub async fn show(State(state): State<AppState>, _auth: RequireAuth, session: Session) -> Response {
    let cart = match orders::cart(state.api(), &session).await {
        Ok(cart) => cart,
        Err(e) => return bounce(e, "/cart"),
    };

    if cart.is_empty() {
        notifications::push(&session, Flash::info("Your cart is empty")).await;
        return Redirect::to("/cart").into_response();
    }

    CheckoutTemplate {
        ctx: PageContext::load(&session).await,
        cart,
    }
    .into_response()
}

/// Place the order and show it.
#[instrument(skip(state, session, _auth, form))]
pub async fn place_order(
    State(state): State<AppState>,
    _auth: RequireAuth,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Response {
    match orders::place_order(state.api(), &session, &form).await {
        Ok(order) => {
            Redirect::to(&format!("/orders/{}", urlencoding::encode(order.id.as_str())))
                .into_response()
        }
        Err(e) => bounce(e, "/checkout"),
    }
}
