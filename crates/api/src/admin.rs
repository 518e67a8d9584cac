//! Admin back-office endpoints.
//!
//! Every call is made with the admin's backend session. Nothing here is
//! cached: the admin panel always shows what the backend holds.

use decor_core::model::{
    Blog, Category, Coupon, ImageUpload, Order, Page, Product, SubCategory, User, Variation,
};
use decor_core::{BlogId, CategoryId, CouponId, OrderId, OrderStatus, ProductId, SubCategoryId, VariationId};
use reqwest::multipart::{Form, Part};
use tracing::{info, instrument};

use crate::client::RestClient;
use crate::error::ApiError;
use crate::requests::{
    BlogInput, CategoryInput, CouponInput, LoginRequest, ProductInput, ProductQuery,
    UpdateOrderStatus, VariationInput,
};
use crate::session::{BackendSession, Login};

/// Largest image accepted for upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Image types accepted for upload.
pub const IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// An image file received from the admin upload form.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Backend endpoints used by the admin panel.
#[derive(Debug, Clone)]
pub struct AdminApi {
    client: RestClient,
}

impl AdminApi {
    #[must_use]
    pub const fn new(client: RestClient) -> Self {
        Self { client }
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
    // Auth
    // =========================================================================

    /// Log in, requiring the `admin` role.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] when the account is not an admin.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Login, ApiError> {
        let url = self.client.endpoint(&["api", "auth", "login"])?;
        let (user, session) = self
            .client
            .post_for_session::<User, _>(url, &LoginRequest { email, password })
            .await?;

        if !user.is_admin() {
            info!(user_id = %user.id, "Non-admin login attempt on admin panel");
            if let Some(session) = &session {
                let _ = self.logout(session).await;
            }
            return Err(ApiError::Forbidden);
        }

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
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn products(
        &self,
        session: &BackendSession,
        query: &ProductQuery,
    ) -> Result<Page<Product>, ApiError> {
        let url = self
            .client
            .endpoint_with_query(&["api", "product"], &query.pairs())?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self, session))]
    pub async fn product(&self, session: &BackendSession, id: &ProductId) -> Result<Product, ApiError> {
        let url = self.client.endpoint(&["api", "product", id.as_str()])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, session, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        session: &BackendSession,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let url = self.client.endpoint(&["api", "product"])?;
        self.scoped(session).post(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, session, input))]
    pub async fn update_product(
        &self,
        session: &BackendSession,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let url = self.client.endpoint(&["api", "product", id.as_str()])?;
        self.scoped(session).put(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn delete_product(&self, session: &BackendSession, id: &ProductId) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "product", id.as_str()])?;
        self.scoped(session).delete_ack(url).await
    }

    // =========================================================================
    // Variations
    // =========================================================================

    /// Variations of one product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn variations(
        &self,
        session: &BackendSession,
        product: &ProductId,
    ) -> Result<Vec<Variation>, ApiError> {
        let url = self.client.endpoint_with_query(
            &["api", "variation"],
            &[("productId", product.to_string())],
        )?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the variation.
    #[instrument(skip(self, session, input))]
    pub async fn create_variation(
        &self,
        session: &BackendSession,
        input: &VariationInput,
    ) -> Result<Variation, ApiError> {
        let url = self.client.endpoint(&["api", "variation"])?;
        self.scoped(session).post(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, session, input))]
    pub async fn update_variation(
        &self,
        session: &BackendSession,
        id: &VariationId,
        input: &VariationInput,
    ) -> Result<Variation, ApiError> {
        let url = self.client.endpoint(&["api", "variation", id.as_str()])?;
        self.scoped(session).put(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn delete_variation(
        &self,
        session: &BackendSession,
        id: &VariationId,
    ) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "variation", id.as_str()])?;
        self.scoped(session).delete_ack(url).await
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Upload an image to the backend's media store.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Parse`] for an empty, oversized or non-image file,
    /// or an error if the backend rejects the upload.
    #[instrument(skip(self, session, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn upload_image(
        &self,
        session: &BackendSession,
        file: ImageFile,
    ) -> Result<ImageUpload, ApiError> {
        if file.bytes.is_empty() {
            return Err(ApiError::Parse("image file is empty".to_string()));
        }
        if file.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::Parse("image is larger than 5 MB".to_string()));
        }
        if !IMAGE_TYPES.contains(&file.content_type.as_str()) {
            return Err(ApiError::Parse(format!(
                "unsupported image type: {}",
                file.content_type
            )));
        }

        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = Form::new().part("image", part);

        let url = self.client.endpoint(&["api", "image", "upload"])?;
        self.scoped(session).post_multipart(url, form).await
    }

    /// Remove an uploaded image by its media-store id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn delete_image(&self, session: &BackendSession, public_id: &str) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "image", public_id])?;
        self.scoped(session).delete_ack(url).await
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn categories(&self, session: &BackendSession) -> Result<Vec<Category>, ApiError> {
        let url = self.client.endpoint(&["api", "category"])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self, session))]
    pub async fn category(&self, session: &BackendSession, id: &CategoryId) -> Result<Category, ApiError> {
        let url = self.client.endpoint(&["api", "category", id.as_str()])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the category.
    #[instrument(skip(self, session, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        session: &BackendSession,
        input: &CategoryInput,
    ) -> Result<Category, ApiError> {
        let url = self.client.endpoint(&["api", "category"])?;
        self.scoped(session).post(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, session, input))]
    pub async fn update_category(
        &self,
        session: &BackendSession,
        id: &CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, ApiError> {
        let url = self.client.endpoint(&["api", "category", id.as_str()])?;
        self.scoped(session).put(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn delete_category(&self, session: &BackendSession, id: &CategoryId) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "category", id.as_str()])?;
        self.scoped(session).delete_ack(url).await
    }

    // =========================================================================
    // Sub-categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn sub_categories(&self, session: &BackendSession) -> Result<Vec<SubCategory>, ApiError> {
        let url = self.client.endpoint(&["api", "subcategory"])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self, session))]
    pub async fn sub_category(
        &self,
        session: &BackendSession,
        id: &SubCategoryId,
    ) -> Result<SubCategory, ApiError> {
        let url = self.client.endpoint(&["api", "subcategory", id.as_str()])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the sub-category.
    #[instrument(skip(self, session, input), fields(name = %input.name))]
    pub async fn create_sub_category(
        &self,
        session: &BackendSession,
        input: &CategoryInput,
    ) -> Result<SubCategory, ApiError> {
        let url = self.client.endpoint(&["api", "subcategory"])?;
        self.scoped(session).post(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, session, input))]
    pub async fn update_sub_category(
        &self,
        session: &BackendSession,
        id: &SubCategoryId,
        input: &CategoryInput,
    ) -> Result<SubCategory, ApiError> {
        let url = self.client.endpoint(&["api", "subcategory", id.as_str()])?;
        self.scoped(session).put(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn delete_sub_category(
        &self,
        session: &BackendSession,
        id: &SubCategoryId,
    ) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "subcategory", id.as_str()])?;
        self.scoped(session).delete_ack(url).await
    }

    // =========================================================================
    // Blogs
    // =========================================================================

    /// One page of posts, drafts included.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn blogs(&self, session: &BackendSession, page: u32) -> Result<Page<Blog>, ApiError> {
        let url = self
            .client
            .endpoint_with_query(&["api", "blog"], &[("page", page.to_string())])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self, session))]
    pub async fn blog(&self, session: &BackendSession, id: &BlogId) -> Result<Blog, ApiError> {
        let url = self.client.endpoint(&["api", "blog", id.as_str()])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the post.
    #[instrument(skip(self, session, input), fields(title = %input.title))]
    pub async fn create_blog(&self, session: &BackendSession, input: &BlogInput) -> Result<Blog, ApiError> {
        let url = self.client.endpoint(&["api", "blog"])?;
        self.scoped(session).post(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, session, input))]
    pub async fn update_blog(
        &self,
        session: &BackendSession,
        id: &BlogId,
        input: &BlogInput,
    ) -> Result<Blog, ApiError> {
        let url = self.client.endpoint(&["api", "blog", id.as_str()])?;
        self.scoped(session).put(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn delete_blog(&self, session: &BackendSession, id: &BlogId) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "blog", id.as_str()])?;
        self.scoped(session).delete_ack(url).await
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn coupons(&self, session: &BackendSession) -> Result<Vec<Coupon>, ApiError> {
        let url = self.client.endpoint(&["api", "coupons"])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self, session))]
    pub async fn coupon(&self, session: &BackendSession, id: &CouponId) -> Result<Coupon, ApiError> {
        let url = self.client.endpoint(&["api", "coupons", id.as_str()])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the coupon.
    #[instrument(skip(self, session, input), fields(code = %input.code))]
    pub async fn create_coupon(
        &self,
        session: &BackendSession,
        input: &CouponInput,
    ) -> Result<Coupon, ApiError> {
        let url = self.client.endpoint(&["api", "coupons"])?;
        self.scoped(session).post(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, session, input))]
    pub async fn update_coupon(
        &self,
        session: &BackendSession,
        id: &CouponId,
        input: &CouponInput,
    ) -> Result<Coupon, ApiError> {
        let url = self.client.endpoint(&["api", "coupons", id.as_str()])?;
        self.scoped(session).put(url, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn delete_coupon(&self, session: &BackendSession, id: &CouponId) -> Result<(), ApiError> {
        let url = self.client.endpoint(&["api", "coupons", id.as_str()])?;
        self.scoped(session).delete_ack(url).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// All orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self, session))]
    pub async fn orders(&self, session: &BackendSession) -> Result<Vec<Order>, ApiError> {
        let url = self.client.endpoint(&["api", "order"])?;
        self.scoped(session).get(url).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self, session))]
    pub async fn order(&self, session: &BackendSession, id: &OrderId) -> Result<Order, ApiError> {
        let url = self.client.endpoint(&["api", "order", id.as_str()])?;
        self.scoped(session).get(url).await
    }

    /// Set an order's status. Any status may follow any other; the backend
    /// decides what is allowed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change.
    #[instrument(skip(self, session, status), fields(status = %status))]
    pub async fn update_order_status(
        &self,
        session: &BackendSession,
        id: &OrderId,
        status: &OrderStatus,
    ) -> Result<Order, ApiError> {
        let url = self
            .client
            .endpoint(&["api", "order", id.as_str(), "status"])?;
        self.scoped(session)
            .put(url, &UpdateOrderStatus { status })
            .await
    }
}
