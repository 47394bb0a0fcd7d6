//! Catalog endpoints.

use bazaar_core::{CategoryId, ProductId};
use tracing::instrument;

use crate::api::types::{
    Category, CategoryInput, CreateProduct, Product, ProductFilter, ProductImage, ProductUpdate,
};
use crate::api::{ApiError, ApiRequest, ApiSession};

impl ApiSession<'_> {
    // ─────────────────────────────────────────────────────────────────────────
    // Products
    // ─────────────────────────────────────────────────────────────────────────

    /// List products, optionally filtered by category and search term.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
        let request = ApiRequest::get("/products/products/")
            .query("category", filter.category_id())
            .query("search", filter.search_term());
        self.fetch(&request).await
    }

    /// Search active products by name or description.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        query: Option<&str>,
        category_id: Option<&str>,
    ) -> Result<Vec<Product>, ApiError> {
        let request = ApiRequest::get("/products/products/search/")
            .query("q", query)
            .query("category_id", category_id);
        self.fetch(&request).await
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the product does not exist.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.fetch(&ApiRequest::get(format!("/products/products/{id}/")))
            .await
    }

    /// Images attached to a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn product_images(&self, id: &ProductId) -> Result<Vec<ProductImage>, ApiError> {
        self.fetch(&ApiRequest::get(format!("/products/products/{id}/images/")))
            .await
    }

    /// Create a product (staff only).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &CreateProduct) -> Result<Product, ApiError> {
        let request = ApiRequest::post("/products/products/").json(product)?;
        self.fetch(&request).await
    }

    /// Partially update a product (staff only).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, id, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, ApiError> {
        let request = ApiRequest::patch(format!("/products/products/{id}/")).json(update)?;
        self.fetch(&request).await
    }

    /// Delete a product (staff only).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        self.execute(&ApiRequest::delete(format!("/products/products/{id}/")))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────────

    /// All categories, served from a five-minute cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is cold and the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(categories) = self.client.cached_categories().await {
            tracing::debug!("Category cache hit");
            return Ok(categories);
        }

        let categories: Vec<Category> = self
            .fetch(&ApiRequest::get("/products/categories/"))
            .await?;
        self.client.cache_categories(categories.clone()).await;
        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the category does not exist.
    #[instrument(skip(self, id), fields(category_id = %id))]
    pub async fn category(&self, id: &CategoryId) -> Result<Category, ApiError> {
        self.fetch(&ApiRequest::get(format!("/products/categories/{id}/")))
            .await
    }

    /// Create a category (staff only).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the category.
    #[instrument(skip(self, category), fields(name = %category.name))]
    pub async fn create_category(&self, category: &CategoryInput) -> Result<Category, ApiError> {
        let request = ApiRequest::post("/products/categories/").json(category)?;
        let created = self.fetch(&request).await?;
        self.client.invalidate_categories().await;
        Ok(created)
    }

    /// Update a category (staff only).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, id, category), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: &CategoryId,
        category: &CategoryInput,
    ) -> Result<Category, ApiError> {
        let request = ApiRequest::patch(format!("/products/categories/{id}/")).json(category)?;
        let updated = self.fetch(&request).await?;
        self.client.invalidate_categories().await;
        Ok(updated)
    }

    /// Delete a category (staff only).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, id), fields(category_id = %id))]
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), ApiError> {
        self.execute(&ApiRequest::delete(format!("/products/categories/{id}/")))
            .await?;
        self.client.invalidate_categories().await;
        Ok(())
    }
}
