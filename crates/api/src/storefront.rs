//! Storefront-facing backend endpoints.
//!
//! Catalog reads are cached with `moka` (5-minute TTL). Cart, orders,
//! wishlist and auth always go to the backend.

use std::sync::Arc;
use std::time::Duration;

use decor_core::model::{
    AppliedCoupon, Blog, Cart, Category, Order, Page, Product, ShippingRates, SubCategory, User,
};
use decor_core::{CartItemId, OrderId, ProductId};
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::client::RestClient;
use crate::error::ApiError;
use crate::requests::{
    AddToCart, AddToWishlist, ApplyCoupon, CreateOrder, LoginRequest, ProductQuery,
    RegisterRequest, UpdateCartItem,
};
use crate::session::{BackendSession, Login};

/// Shortest query sent to the suggestion endpoint.
pub const MIN_SUGGESTION_QUERY: usize = 2;
/// Most suggestions returned.
pub const MAX_SUGGESTIONS: usize = 8;

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 1000;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    CategoryBySlug(String),
    SubCategories(Option<String>),
    Products(ProductQuery),
    ProductBySlug(String),
    Suggestions(String),
    Shipping,
}

/// Cached catalog values.
#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Category(Box<Category>),
    SubCategories(Arc<Vec<SubCategory>>),
    Products(Arc<Page<Product>>),
    Product(Box<Product>),
    Suggestions(Arc<Vec<Product>>),
    Shipping(ShippingRates),
}

/// Backend endpoints used by the storefront.
#[derive(Clone)]
pub struct StorefrontApi {
    client: RestClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl StorefrontApi {
    #[must_use]
    pub fn new(client: RestClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();
        Self { client, cache }
    }

    /// Underlying transport.
    #[must_use]
    pub const fn client(&self) -> &RestClient {
        &self.client
    }

    fn scoped(&self, session: &BackendSession) -> RestClient {
        self.client.with_session(session.clone())
    }

    // =========================================================================
    // Catalog (cached)
    // =========================================================================

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, ApiError> {
        if let Some(CacheValue::Categories(hit)) = self.cache.get(&CacheKey::Categories).await {
            debug!("Cache hit for categories");
            return Ok(hit);
        }

        let url = self.client.endpoint(&["api", "category"])?;
        let categories: Arc<Vec<Category>> = Arc::new(self.client.get(url).await?);
        self.cache
            .insert(CacheKey::Categories, CacheValue::Categories(Arc::clone(&categories)))
            .await;
        Ok(categories)
    }

    /// A category by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown slug.
    #[instrument(skip(self))]
    pub async fn category_by_slug(&self, slug: &str) -> Result<Category, ApiError> {
        let key = CacheKey::CategoryBySlug(slug.to_string());
        if let Some(CacheValue::Category(hit)) = self.cache.get(&key).await {
            return Ok(*hit);
        }

        let url = self.client.endpoint(&["api", "category", "slug", slug])?;
        let category: Category = self.client.get(url).await?;
        self.cache
            .insert(key, CacheValue::Category(Box::new(category.clone())))
            .await;
        Ok(category)
    }

    /// Sub-categories, optionally restricted to one parent category id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn sub_categories(
        &self,
        category: Option<&str>,
    ) -> Result<Arc<Vec<SubCategory>>, ApiError> {
        let key = CacheKey::SubCategories(category.map(str::to_owned));
        if let Some(CacheValue::SubCategories(hit)) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let query: Vec<(&str, String)> = category
            .map(|c| vec![("category", c.to_string())])
            .unwrap_or_default();
        let url = self.client.endpoint_with_query(&["api", "subcategory"], &query)?;
        let subs: Arc<Vec<SubCategory>> = Arc::new(self.client.get(url).await?);
        self.cache
            .insert(key, CacheValue::SubCategories(Arc::clone(&subs)))
            .await;
        Ok(subs)
    }

    /// One page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Arc<Page<Product>>, ApiError> {
        let key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(hit)) = self.cache.get(&key).await {
            debug!("Cache hit for product listing");
            return Ok(hit);
        }

        let url = self
            .client
            .endpoint_with_query(&["api", "product"], &query.pairs())?;
        let page: Arc<Page<Product>> = Arc::new(self.client.get(url).await?);
        self.cache
            .insert(key, CacheValue::Products(Arc::clone(&page)))
            .await;
        Ok(page)
    }

    /// A product by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown slug.
    #[instrument(skip(self))]
    pub async fn product_by_slug(&self, slug: &str) -> Result<Product, ApiError> {
        let key = CacheKey::ProductBySlug(slug.to_string());
        if let Some(CacheValue::Product(hit)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*hit);
        }

        let url = self.client.endpoint(&["api", "product", "slug", slug])?;
        let product: Product = self.client.get(url).await?;
        self.cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Search-as-you-type suggestions.
    ///
    /// Queries shorter than [`MIN_SUGGESTION_QUERY`] characters return nothing
    /// without calling the backend. At most [`MAX_SUGGESTIONS`] are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn suggestions(&self, query: &str) -> Result<Arc<Vec<Product>>, ApiError> {
        let normalized = query.trim().to_lowercase();
        if normalized.chars().count() < MIN_SUGGESTION_QUERY {
            return Ok(Arc::new(Vec::new()));
        }

        let key = CacheKey::Suggestions(normalized.clone());
        if let Some(CacheValue::Suggestions(hit)) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let url = self
            .client
            .endpoint_with_query(&["api", "product", "suggestions"], &[("q", normalized)])?;
        let mut found: Vec<Product> = self.client.get(url).await?;
        found.truncate(MAX_SUGGESTIONS);
        let found = Arc::new(found);
        self.cache
            .insert(key, CacheValue::Suggestions(Arc::clone(&found)))
            .await;
        Ok(found)
    }

    /// Shipping cost, free-shipping threshold and tax rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn shipping_rates(&self) -> Result<ShippingRates, ApiError> {
        if let Some(CacheValue::Shipping(hit)) = self.cache.get(&CacheKey::Shipping).await {
            return Ok(hit);
        }

        let url = self.client.endpoint(&["api", "shipping"])?;
        let rates: ShippingRates = self.client.get(url).await?;
        self.cache
            .insert(CacheKey::Shipping, CacheValue::Shipping(rates.clone()))
            .await;
        Ok(rates)
    }

    /// Drop every cached catalog entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    // =========================================================================
    // Blog
    // =========================================================================

    /// One page of published posts.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn blogs(&self, page: u32) -> Result<Page<Blog>, ApiError> {
        let url = self.client.endpoint_with_query(
            &["api", "blog"],
            &[("page", page.to_string()), ("published", "true".to_string())],
        )?;
        self.client.get(url).await
    }

    /// A post by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown slug.
    #[instrument(skip(self))]
    pub async fn blog_by_slug(&self, slug: &str) -> Result<Blog, ApiError> {
        let url = self.client.endpoint(&["api", "blog", "slug", slug])?;
        self.client.get(url).await
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Log in and capture the backend session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for bad credentials and
    /// [`ApiError::MissingData`] when the backend set no session cookie.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Login, ApiError> {
        let url = self.client.endpoint(&["api", "auth", "login"])?;
        let (user, session) = self
            .client
            .post_for_session::<User, _>(url, &LoginRequest { email, password })
            .await?;
        let session = session.ok_or(ApiError::MissingData)?;
        Ok(Login { user, session })
    }

    /// Register a customer account. The backend logs the new user in.
    ///
    /// # Errors
    ///
    /// Returns an error if registration is rejected.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Login, ApiError> {
        let url = self.client.endpoint(&["api", "auth", "register"])?;
        let (user, session) = self
            .client
            .post_for_session::<User, _>(url, &RegisterRequest { name, email, password })
            .await?;
        let session = session.ok_or(ApiError::MissingData)?;
        Ok(Login { user, session })
    }

    /// End the backend session.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn logout(&self, session: &BackendSession) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "auth", "logout"])?;
        self.scoped(session).post_ack(url, &serde_json::json!({})).await
    }

    /// The user the session belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the session has expired.
    #[instrument(skip(self, session))]
    pub async fn me(&self, session: &BackendSession) -> Result<User, ApiError> {
        let url = self.client.endpoint(&["api", "auth", "me"])?;
        self.scoped(session).get(url).await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The visitor's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn cart(&self, session: &BackendSession) -> Result<Cart, ApiError> {
        let url = self.client.endpoint(&["api", "cart"])?;
        self.scoped(session).get(url).await
    }

    /// Add a product (or one of its variations) to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the line.
    #[instrument(skip(self, session))]
    pub async fn add_to_cart(
        &self,
        session: &BackendSession,
        line: &AddToCart<'_>,
    ) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "cart"])?;
        self.scoped(session).post_ack(url, line).await
    }

    /// Change a cart line's quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the quantity.
    #[instrument(skip(self, session))]
    pub async fn update_cart_item(
        &self,
        session: &BackendSession,
        item: &CartItemId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "cart", item.as_str()])?;
        self.scoped(session)
            .put_ack(url, &UpdateCartItem { quantity })
            .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn remove_cart_item(
        &self,
        session: &BackendSession,
        item: &CartItemId,
    ) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "cart", item.as_str()])?;
        self.scoped(session).delete_ack(url).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn clear_cart(&self, session: &BackendSession) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "cart"])?;
        self.scoped(session).delete_ack(url).await
    }

    // =========================================================================
    // Coupons and orders
    // =========================================================================

    /// Ask the backend to apply a coupon code to a cart subtotal.
    ///
    /// # Errors
    ///
    /// Returns an error with the backend's reason when the code is rejected.
    #[instrument(skip(self, session))]
    pub async fn apply_coupon(
        &self,
        session: &BackendSession,
        request: &ApplyCoupon<'_>,
    ) -> Result<AppliedCoupon, ApiError> {
        let url = self.client.endpoint(&["api", "coupons", "apply"])?;
        self.scoped(session).post(url, request).await
    }

    /// Place an order for the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order.
    #[instrument(skip(self, session, order))]
    pub async fn create_order(
        &self,
        session: &BackendSession,
        order: &CreateOrder<'_>,
    ) -> Result<Order, ApiError> {
        let url = self.client.endpoint(&["api", "order"])?;
        self.scoped(session).post(url, order).await
    }

    /// The visitor's orders, newest first as returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn my_orders(&self, session: &BackendSession) -> Result<Vec<Order>, ApiError> {
        let url = self.client.endpoint(&["api", "order", "my-orders"])?;
        self.scoped(session).get(url).await
    }

    /// One of the visitor's orders.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self, session))]
    pub async fn order(&self, session: &BackendSession, id: &OrderId) -> Result<Order, ApiError> {
        let url = self.client.endpoint(&["api", "order", id.as_str()])?;
        self.scoped(session).get(url).await
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Products on the visitor's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn wishlist(&self, session: &BackendSession) -> Result<Vec<Product>, ApiError> {
        let url = self.client.endpoint(&["api", "wishlist"])?;
        self.scoped(session).get(url).await
    }

    /// Add a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn add_to_wishlist(
        &self,
        session: &BackendSession,
        product: &ProductId,
    ) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "wishlist"])?;
        self.scoped(session)
            .post_ack(url, &AddToWishlist { product_id: product })
            .await
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn remove_from_wishlist(
        &self,
        session: &BackendSession,
        product: &ProductId,
    ) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "wishlist", product.as_str()])?;
        self.scoped(session).delete_ack(url).await
    }
}

impl std::fmt::Debug for StorefrontApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontApi")
            .field("client", &self.client)
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::client::BackendConfig;

    fn api() -> StorefrontApi {
        let client = RestClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: SecretString::from("test-key"),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        StorefrontApi::new(client)
    }

    #[tokio::test]
    async fn test_short_suggestion_query_skips_backend() {
        // The backend is unreachable, so any request would fail
        assert!(api().suggestions(" a ").await.unwrap().is_empty());
        assert!(api().suggestions("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_errors_are_not_cached() {
        let api = api();
        assert!(api.categories().await.is_err());
        assert_eq!(api.cache.entry_count(), 0);
    }
}
