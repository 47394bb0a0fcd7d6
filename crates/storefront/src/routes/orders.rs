//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use bazaar_core::OrderId;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::Order;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::{PageContext, bounce, recover};
use crate::services::orders;
use crate::state::AppState;

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub ctx: PageContext,
    pub orders: Vec<Order>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub order: Order,
}

/// Display the visitor's orders.
#[instrument(skip(state, session, _auth))]
pub async fn index(
    State(state): State<AppState>,
    _auth: RequireAuth,
    session: Session,
) -> Result<OrdersIndexTemplate> {
    let orders = recover(orders::orders(state.api(), &session).await)?;

    Ok(OrdersIndexTemplate {
        ctx: PageContext::load(&session).await,
        orders: orders.unwrap_or_default(),
    })
}

/// Display one order.
#[instrument(skip(state, session, _auth))]
pub async fn show(
    State(state): State<AppState>,
    _auth: RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    match orders::order(state.api(), &session, &OrderId::new(id)).await {
        Ok(order) => OrderShowTemplate {
            ctx: PageContext::load(&session).await,
            order,
        }
        .into_response(),
        Err(e) => bounce(e, "/orders"),
    }
}

/// Cancel an order and show the reloaded order list.
#[instrument(skip(state, session, _auth))]
pub async fn cancel(
    State(state): State<AppState>,
    _auth: RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    match orders::cancel_order(state.api(), &session, &OrderId::new(id)).await {
        Ok(orders) => OrdersIndexTemplate {
            ctx: PageContext::load(&session).await,
            orders,
        }
        .into_response(),
        Err(e) => bounce(e, "/orders"),
    }
}
