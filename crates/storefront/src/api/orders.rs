//! Cart and order endpoints.

use bazaar_core::{CartItemId, OrderId, ProductId};
use tracing::instrument;

use crate::api::types::{
    AddToCartRequest, Cart, CreateOrderRequest, Order, UpdateCartItemRequest,
};
use crate::api::{ApiError, ApiRequest, ApiSession};

impl ApiSession<'_> {
    /// The signed-in user's cart, created on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session has expired.
    #[instrument(skip(self))]
    pub async fn my_cart(&self) -> Result<Cart, ApiError> {
        self.fetch(&ApiRequest::get("/orders/cart/my_cart/")).await
    }

    /// Add `quantity` units of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the item (e.g. out of stock).
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub async fn add_to_cart(&self, product_id: &ProductId, quantity: u32) -> Result<Cart, ApiError> {
        let request = ApiRequest::post("/orders/cart/add_item/").json(&AddToCartRequest {
            product_id,
            quantity,
        })?;
        self.fetch(&request).await
    }

    /// Set the quantity of a cart line; `0` removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let request = ApiRequest::post("/orders/cart/update_item/").json(&UpdateCartItemRequest {
            item_id,
            quantity,
        })?;
        self.fetch(&request).await
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.execute(&ApiRequest::delete("/orders/cart/clear/")).await
    }

    /// The signed-in user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session has expired.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.fetch(&ApiRequest::get("/orders/orders/")).await
    }

    /// Get one of the signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the order does not exist.
    #[instrument(skip(self, id), fields(order_id = %id))]
    pub async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.fetch(&ApiRequest::get(format!("/orders/orders/{id}/")))
            .await
    }

    /// Place an order from the current cart; the backend empties the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is empty or stock ran out.
    #[instrument(skip(self, shipping_address))]
    pub async fn create_order_from_cart(&self, shipping_address: &str) -> Result<Order, ApiError> {
        let request = ApiRequest::post("/orders/orders/create_from_cart/")
            .json(&CreateOrderRequest { shipping_address })?;
        self.fetch(&request).await
    }

    /// Cancel a pending or processing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses (e.g. the order has shipped).
    #[instrument(skip(self, id), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.fetch(&ApiRequest::post(format!("/orders/orders/{id}/cancel/")))
            .await
    }
}
