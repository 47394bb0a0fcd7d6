//! Cart, checkout and order hooks.

use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{CartItemId, OrderId, ProductId};

use crate::api::{ApiClient, Cart, Order, SessionTokenStore};
use crate::models::Flash;
use crate::services::validation::{CheckoutForm, validate_quantity};
use crate::services::{HookResult, notifications, reject, settle};

// ─────────────────────────────────────────────────────────────────────────────
// Cart
// ─────────────────────────────────────────────────────────────────────────────

/// The visitor's cart.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the cart cannot be loaded.
#[instrument(skip(api, session))]
pub async fn cart(api: &ApiClient, session: &Session) -> HookResult<Cart> {
    let tokens = SessionTokenStore::new(session.clone());
    settle(
        session,
        api.session(&tokens).my_cart().await,
        "Could not load your cart",
    )
    .await
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the quantity is zero or the
/// backend refuses the item.
#[instrument(skip(api, session, product_id), fields(product_id = %product_id))]
pub async fn add_to_cart(
    api: &ApiClient,
    session: &Session,
    product_id: &ProductId,
    quantity: u32,
) -> HookResult<Cart> {
    let quantity = match validate_quantity(quantity) {
        Ok(quantity) => quantity,
        Err(e) => return Err(reject(session, &e).await),
    };

    let tokens = SessionTokenStore::new(session.clone());
    let cart = settle(
        session,
        api.session(&tokens).add_to_cart(product_id, quantity).await,
        "Could not add to cart",
    )
    .await?;

    notifications::push(session, Flash::success("Added to cart")).await;
    Ok(cart)
}

/// Change a cart line's quantity; `0` removes the line.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the backend refuses the update.
#[instrument(skip(api, session, item_id), fields(item_id = %item_id))]
pub async fn update_cart_item(
    api: &ApiClient,
    session: &Session,
    item_id: &CartItemId,
    quantity: u32,
) -> HookResult<Cart> {
    let tokens = SessionTokenStore::new(session.clone());
    let cart = settle(
        session,
        api.session(&tokens)
            .update_cart_item(item_id, quantity)
            .await,
        "Could not update your cart",
    )
    .await?;

    let message = if quantity == 0 {
        "Item removed from cart"
    } else {
        "Quantity updated"
    };
    notifications::push(session, Flash::success(message)).await;
    Ok(cart)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the backend refuses.
#[instrument(skip(api, session))]
pub async fn clear_cart(api: &ApiClient, session: &Session) -> HookResult<()> {
    let tokens = SessionTokenStore::new(session.clone());
    settle(
        session,
        api.session(&tokens).clear_cart().await,
        "Could not clear your cart",
    )
    .await?;

    notifications::push(session, Flash::success("Cart cleared")).await;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders
// ─────────────────────────────────────────────────────────────────────────────

/// The visitor's orders.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the orders cannot be loaded.
#[instrument(skip(api, session))]
pub async fn orders(api: &ApiClient, session: &Session) -> HookResult<Vec<Order>> {
    let tokens = SessionTokenStore::new(session.clone());
    settle(
        session,
        api.session(&tokens).my_orders().await,
        "Could not load your orders",
    )
    .await
}

/// One of the visitor's orders.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the order cannot be loaded.
#[instrument(skip(api, session, id), fields(order_id = %id))]
pub async fn order(api: &ApiClient, session: &Session, id: &OrderId) -> HookResult<Order> {
    let tokens = SessionTokenStore::new(session.clone());
    settle(
        session,
        api.session(&tokens).order(id).await,
        "Could not load this order",
    )
    .await
}

/// Turn the cart into an order.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if no shipping address was given
/// or the backend refuses (empty cart, stock ran out).
#[instrument(skip(api, session, form))]
pub async fn place_order(
    api: &ApiClient,
    session: &Session,
    form: &CheckoutForm,
) -> HookResult<Order> {
    let shipping_address = match form.validate() {
        Ok(address) => address,
        Err(e) => return Err(reject(session, &e).await),
    };

    let tokens = SessionTokenStore::new(session.clone());
    let order = settle(
        session,
        api.session(&tokens)
            .create_order_from_cart(&shipping_address)
            .await,
        "Could not place your order",
    )
    .await?;

    notifications::push(session, Flash::success("Order placed successfully!")).await;
    tracing::info!(order_id = %order.id, "Order placed");
    Ok(order)
}

/// Cancel an order, then reload the order list.
///
/// # Errors
///
/// Returns a [`crate::services::HookError`] if the backend refuses the
/// cancellation or the list cannot be reloaded.
#[instrument(skip(api, session, id), fields(order_id = %id))]
pub async fn cancel_order(
    api: &ApiClient,
    session: &Session,
    id: &OrderId,
) -> HookResult<Vec<Order>> {
    let tokens = SessionTokenStore::new(session.clone());
    settle(
        session,
        api.session(&tokens).cancel_order(id).await,
        "Could not cancel this order",
    )
    .await?;

    notifications::push(session, Flash::success("Order cancelled")).await;
    orders(api, session).await
}
