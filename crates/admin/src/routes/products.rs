//! Product route handlers.
//!
//! Products are edited on one page together with their variations and
//! images. Image changes are saved straight away by re-sending the product
//! with the new image list.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Response},
};
use decor_api::ImageFile;
use decor_api::requests::{ProductInput, ProductQuery, VariationInput};
use decor_core::model::{Attribute, Image, Product};
use decor_core::slice::Slice;
use decor_core::slug::slug_or_derive;
use decor_core::validation::{
    MAX_CATEGORY_NAME_LEN, ValidationError, ValidationResult, validate_product, validate_text,
};
use decor_core::{CategoryId, ProductId, SubCategoryId, VariationId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::CurrentAdmin;
use crate::routes::{
    empty_string_as_none, form_error, into_slice, non_blank, not_found_as, parse_amount,
    parse_count, redirect_with_error, redirect_with_notice,
};
use crate::state::AppState;
use crate::views::{
    ImageView, Layout, Pagination, ProductRow, SelectOption, VariationRow, record_options,
};

/// Products per page in the list.
const PAGE_SIZE: u32 = 20;

/// Multipart field carrying the uploaded file.
const IMAGE_FIELD: &str = "image";

// =============================================================================
// Forms
// =============================================================================

/// List filters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u32>,
}

/// Product form as typed. Kept as text so a rejected form comes back as entered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: String,
    pub discount_price: String,
    pub stock: String,
    pub category: String,
    pub sub_category: String,
    /// One `Name: Value` pair per line.
    pub attributes: String,
    /// Checkbox; present when ticked.
    pub is_featured: Option<String>,
}

impl ProductForm {
    /// Prefill from a saved product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            discount_price: product
                .discount_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            stock: product.stock.to_string(),
            category: product
                .category
                .as_ref()
                .map(|c| c.id().to_string())
                .unwrap_or_default(),
            sub_category: product
                .sub_category
                .as_ref()
                .map(|c| c.id().to_string())
                .unwrap_or_default(),
            attributes: product
                .attributes
                .iter()
                .map(|a| format!("{}: {}", a.name, a.value))
                .collect::<Vec<_>>()
                .join("\n"),
            is_featured: product.is_featured.then(|| "on".to_string()),
        }
    }

    /// Validate and build the payload, keeping `images`.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn to_input(&self, images: Vec<Image>) -> ValidationResult<ProductInput> {
        let price = parse_amount("price", &self.price)?
            .ok_or(ValidationError::Required { field: "price" })?;
        let discount_price = parse_amount("discount price", &self.discount_price)?;
        let stock = parse_count::<i64>("stock", &self.stock)?.unwrap_or(0);
        let name = self.name.trim();
        validate_product(name, price, discount_price, stock)?;

        Ok(ProductInput {
            name: name.to_string(),
            slug: slug_or_derive(non_blank(&self.slug).as_deref(), name),
            description: self.description.trim().to_string(),
            price,
            discount_price,
            stock,
            category: non_blank(&self.category).map(CategoryId::new),
            sub_category: non_blank(&self.sub_category).map(SubCategoryId::new),
            images,
            attributes: parse_attributes(&self.attributes)?,
            is_featured: self.is_featured.is_some(),
        })
    }
}

/// Parse `Name: Value` lines. Blank lines are skipped.
fn parse_attributes(text: &str) -> ValidationResult<Vec<Attribute>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (name, value) = line
                .split_once(':')
                .map(|(n, v)| (n.trim(), v.trim()))
                .filter(|(n, v)| !n.is_empty() && !v.is_empty())
                .ok_or(ValidationError::InvalidFormat {
                    field: "attributes",
                    reason: "must be one `Name: Value` pair per line",
                })?;
            Ok(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Payload that re-sends a saved product with a new image list.
fn product_input(product: &Product, images: Vec<Image>) -> ProductInput {
    ProductInput {
        name: product.name.clone(),
        slug: product.slug.clone(),
        description: product.description.clone(),
        price: product.price,
        discount_price: product.discount_price,
        stock: product.stock,
        category: product.category.as_ref().map(|c| CategoryId::new(c.id())),
        sub_category: product
            .sub_category
            .as_ref()
            .map(|c| SubCategoryId::new(c.id())),
        images,
        attributes: product.attributes.clone(),
        is_featured: product.is_featured,
    }
}

/// Key identifying an image in the remove form.
fn image_key(image: &Image) -> &str {
    image.public_id.as_deref().unwrap_or(&image.url)
}

/// Variation form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VariationForm {
    pub name: String,
    pub value: String,
    pub price: String,
    pub stock: String,
    pub sku: String,
}

impl VariationForm {
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn to_input(&self, product_id: ProductId) -> ValidationResult<VariationInput> {
        let name = validate_text("variation name", &self.name, MAX_CATEGORY_NAME_LEN)?;
        let value = validate_text("variation value", &self.value, MAX_CATEGORY_NAME_LEN)?;
        let price = parse_amount("variation price", &self.price)?;
        if price.is_some_and(|p| p <= rust_decimal::Decimal::ZERO) {
            return Err(ValidationError::OutOfRange {
                field: "variation price",
                reason: "must be greater than zero",
            });
        }
        let stock = parse_count::<i64>("variation stock", &self.stock)?.unwrap_or(0);
        if stock < 0 {
            return Err(ValidationError::OutOfRange {
                field: "variation stock",
                reason: "cannot be negative",
            });
        }

        Ok(VariationInput {
            product_id,
            name: name.to_string(),
            value: value.to_string(),
            price,
            stock,
            sku: non_blank(&self.sku),
        })
    }
}

/// Image removal form.
#[derive(Debug, Deserialize)]
pub struct RemoveImageForm {
    pub key: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsTemplate {
    pub layout: Layout,
    pub products: Slice<ProductRow>,
    pub total: u64,
    pub q: String,
    pub category_options: Vec<SelectOption>,
    pub pagination: Pagination,
}

/// Parts of the form page that only exist for a saved product.
pub struct SavedProduct {
    pub id: String,
    pub name: String,
    pub variations: Slice<VariationRow>,
    pub images: Vec<ImageView>,
}

/// New/edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub form: ProductForm,
    pub error: Option<String>,
    pub category_options: Vec<SelectOption>,
    pub sub_category_options: Vec<SelectOption>,
    pub saved: Option<SavedProduct>,
}

fn edit_path(id: &ProductId) -> String {
    format!("/products/{id}/edit")
}

/// Variations and images of a saved product for the form page.
async fn saved_product(state: &AppState, admin: &CurrentAdmin, product: &Product) -> Result<SavedProduct> {
    let currency = state.currency();
    let mut variations = into_slice(
        state.api().variations(&admin.backend, &product.id).await,
        "variations",
    )?;
    if variations.is_error() && !product.variations.is_empty() {
        variations.fulfilled(product.variations.clone());
    }

    Ok(SavedProduct {
        id: product.id.to_string(),
        name: product.name.clone(),
        variations: variations.map(|v| VariationRow::new(&v, currency)),
        images: product
            .images
            .iter()
            .map(|img| ImageView {
                url: img.url.clone(),
                public_id: image_key(img).to_string(),
            })
            .collect(),
    })
}

/// Render the form page with category pickers loaded.
async fn render_form(
    state: &AppState,
    admin: &CurrentAdmin,
    layout: Layout,
    form: ProductForm,
    error: Option<String>,
    saved: Option<SavedProduct>,
) -> Result<Response> {
    let api = state.api();
    let (categories, sub_categories) = tokio::join!(
        api.categories(&admin.backend),
        api.sub_categories(&admin.backend)
    );
    let categories = into_slice(categories, "categories")?;
    let sub_categories = into_slice(sub_categories, "sub-categories")?;

    let (heading, action) = match &saved {
        Some(saved) => (format!("Edit {}", saved.name), format!("/products/{}", saved.id)),
        None => ("New product".to_string(), "/products".to_string()),
    };

    Ok(ProductFormTemplate {
        layout,
        heading,
        action,
        category_options: record_options(&categories.items, &form.category, "No category"),
        sub_category_options: record_options(
            &sub_categories.items,
            &form.sub_category,
            "No sub-category",
        ),
        form,
        error,
        saved,
    }
    .into_response())
}

async fn load_product(state: &AppState, admin: &CurrentAdmin, id: &ProductId) -> Result<Product> {
    state
        .api()
        .product(&admin.backend, id)
        .await
        .map_err(not_found_as(format!("product {id}")))
}

// =============================================================================
// Product Routes
// =============================================================================

/// List products.
#[instrument(skip(state, admin, layout))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Query(query): Query<ProductsQuery>,
) -> Result<impl IntoResponse> {
    let api = state.api();
    let page = query.page.unwrap_or(1).max(1);
    let product_query = ProductQuery {
        category: non_blank(&query.category),
        search: non_blank(&query.q),
        page: Some(page),
        limit: Some(PAGE_SIZE),
        ..ProductQuery::default()
    };
    let (products, categories) = tokio::join!(
        api.products(&admin.backend, &product_query),
        api.categories(&admin.backend)
    );

    let (products, total, pages) = match products {
        Ok(listing) => (Ok(listing.items), listing.total, listing.pages),
        Err(e) => (Err(e), 0, 1),
    };
    let currency = state.currency();
    let threshold = state.config().low_stock_threshold;
    let products = into_slice(products, "products")?.map(|p| ProductRow::new(&p, currency, threshold));
    let categories = into_slice(categories, "categories")?;

    Ok(ProductsTemplate {
        layout,
        products,
        total,
        pagination: Pagination::new(
            "/products",
            &[("q", &query.q), ("category", &query.category)],
            page,
            pages,
        ),
        category_options: record_options(&categories.items, query.category.trim(), "All categories"),
        q: query.q.trim().to_string(),
    })
}

/// Display the new product form.
#[instrument(skip(state, admin, layout))]
pub async fn new(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<Response> {
    render_form(&state, &admin, layout, ProductForm::default(), None, None).await
}

/// Create a product, then continue on its edit page for variations and images.
#[instrument(skip(state, admin, session, layout, form))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.to_input(Vec::new()) {
        Ok(input) => input,
        Err(e) => return render_form(&state, &admin, layout, form, Some(e.to_string()), None).await,
    };

    match state.api().create_product(&admin.backend, &input).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product created");
            Ok(redirect_with_notice(
                &session,
                format!("Product \"{}\" created.", product.name),
                &edit_path(&product.id),
            )
            .await)
        }
        Err(e) => {
            let message = form_error(e)?;
            render_form(&state, &admin, layout, form, Some(message), None).await
        }
    }
}

/// Display the edit form with variations and images.
#[instrument(skip(state, admin, layout))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let product = load_product(&state, &admin, &id).await?;
    let saved = saved_product(&state, &admin, &product).await?;
    render_form(
        &state,
        &admin,
        layout,
        ProductForm::from_product(&product),
        None,
        Some(saved),
    )
    .await
}

/// Save the product form. Images are kept as they are.
#[instrument(skip(state, admin, session, layout, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let product = load_product(&state, &admin, &id).await?;

    let error = match form.to_input(product.images.clone()) {
        Ok(input) => match state.api().update_product(&admin.backend, &id, &input).await {
            Ok(updated) => {
                tracing::info!(product_id = %id, "Product updated");
                return Ok(redirect_with_notice(
                    &session,
                    format!("Product \"{}\" saved.", updated.name),
                    &edit_path(&id),
                )
                .await);
            }
            Err(e) => form_error(e)?,
        },
        Err(e) => e.to_string(),
    };

    let saved = saved_product(&state, &admin, &product).await?;
    render_form(&state, &admin, layout, form, Some(error), Some(saved)).await
}

/// Delete a product.
#[instrument(skip(state, admin, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    match state.api().delete_product(&admin.backend, &id).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product deleted");
            Ok(redirect_with_notice(&session, "Product deleted.", "/products").await)
        }
        Err(e) => redirect_with_error(&session, e, "/products").await,
    }
}

// =============================================================================
// Variation Routes
// =============================================================================

/// Add a variation to a product.
#[instrument(skip(state, admin, session, form))]
pub async fn add_variation(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<VariationForm>,
) -> Result<Response> {
    let back = edit_path(&id);
    let input = match form.to_input(id) {
        Ok(input) => input,
        Err(e) => return redirect_with_error(&session, e, &back).await,
    };

    match state.api().create_variation(&admin.backend, &input).await {
        Ok(variation) => {
            Ok(redirect_with_notice(&session, format!("Variation {} added.", variation.label()), &back).await)
        }
        Err(e) => redirect_with_error(&session, e, &back).await,
    }
}

/// Delete one variation.
#[instrument(skip(state, admin, session))]
pub async fn delete_variation(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path((id, variation_id)): Path<(ProductId, VariationId)>,
) -> Result<Response> {
    let back = edit_path(&id);
    match state.api().delete_variation(&admin.backend, &variation_id).await {
        Ok(()) => Ok(redirect_with_notice(&session, "Variation deleted.", &back).await),
        Err(e) => redirect_with_error(&session, e, &back).await,
    }
}

// =============================================================================
// Image Routes
// =============================================================================

/// Read the image part of an upload form.
async fn read_image(mut multipart: Multipart) -> Result<Option<ImageFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        // Browsers send an empty part when no file was chosen
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(ImageFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// Upload an image and attach it to the product.
///
/// The upload is removed again if the product cannot be saved with it.
#[instrument(skip(state, admin, session, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response> {
    let back = edit_path(&id);
    let file = match read_image(multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            let error = AppError::BadRequest("Choose an image to upload.".to_string());
            return redirect_with_error(&session, error, &back).await;
        }
        Err(e) => return redirect_with_error(&session, e, &back).await,
    };

    let api = state.api();
    let upload = match api.upload_image(&admin.backend, file).await {
        Ok(upload) => upload,
        Err(e) => return redirect_with_error(&session, e, &back).await,
    };

    let saved = match api.product(&admin.backend, &id).await {
        Ok(product) => {
            let mut images = product.images.clone();
            images.push(Image {
                url: upload.url.clone(),
                public_id: Some(upload.public_id.clone()),
            });
            api.update_product(&admin.backend, &id, &product_input(&product, images))
                .await
        }
        Err(e) => Err(e),
    };

    match saved {
        Ok(_) => {
            tracing::info!(product_id = %id, public_id = %upload.public_id, "Image attached");
            Ok(redirect_with_notice(&session, "Image uploaded.", &back).await)
        }
        Err(e) => {
            if let Err(cleanup) = api.delete_image(&admin.backend, &upload.public_id).await {
                tracing::warn!(error = %cleanup, public_id = %upload.public_id, "Failed to remove orphaned upload");
            }
            redirect_with_error(&session, e, &back).await
        }
    }
}

/// Detach an image from the product and delete it from the media store.
#[instrument(skip(state, admin, session, form))]
pub async fn remove_image(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<RemoveImageForm>,
) -> Result<Response> {
    let back = edit_path(&id);
    let api = state.api();
    let product = match api.product(&admin.backend, &id).await {
        Ok(product) => product,
        Err(e) => return redirect_with_error(&session, e, &back).await,
    };

    let (removed, kept): (Vec<Image>, Vec<Image>) = product
        .images
        .iter()
        .cloned()
        .partition(|img| image_key(img) == form.key);
    if removed.is_empty() {
        let error = AppError::NotFound("image".to_string());
        return redirect_with_error(&session, error, &back).await;
    }

    if let Err(e) = api
        .update_product(&admin.backend, &id, &product_input(&product, kept))
        .await
    {
        return redirect_with_error(&session, e, &back).await;
    }

    for public_id in removed.iter().filter_map(|img| img.public_id.as_deref()) {
        if let Err(e) = api.delete_image(&admin.backend, public_id).await {
            tracing::warn!(error = %e, public_id, "Failed to delete image from media store");
        }
    }
    Ok(redirect_with_notice(&session, "Image removed.", &back).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: " Linen Throw ".to_string(),
            price: "49.00".to_string(),
            stock: "8".to_string(),
            category: "c1".to_string(),
            attributes: "Material: Linen\n\nColor : Sand".to_string(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_to_input_derives_slug_and_attributes() {
        let input = form().to_input(Vec::new()).unwrap();
        assert_eq!(input.name, "Linen Throw");
        assert_eq!(input.slug, "linen-throw");
        assert_eq!(input.price, Decimal::from_str("49.00").unwrap());
        assert_eq!(input.stock, 8);
        assert_eq!(input.category, Some(CategoryId::new("c1")));
        assert!(input.sub_category.is_none());
        assert_eq!(input.attributes.len(), 2);
        assert_eq!(input.attributes[1].name, "Color");
        assert_eq!(input.attributes[1].value, "Sand");
        assert!(!input.is_featured);
    }

    #[test]
    fn test_to_input_requires_price() {
        let form = ProductForm {
            price: " ".to_string(),
            ..form()
        };
        assert_eq!(
            form.to_input(Vec::new()).unwrap_err(),
            ValidationError::Required { field: "price" }
        );
    }

    #[test]
    fn test_to_input_rejects_sale_price_above_price() {
        let form = ProductForm {
            discount_price: "60".to_string(),
            ..form()
        };
        assert_eq!(form.to_input(Vec::new()).unwrap_err().field(), "discount price");
    }

    #[test]
    fn test_bad_attribute_line() {
        let form = ProductForm {
            attributes: "Material Linen".to_string(),
            ..form()
        };
        assert_eq!(form.to_input(Vec::new()).unwrap_err().field(), "attributes");
    }

    #[test]
    fn test_from_product_round_trips_through_form() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p1", "name": "Jute Rug", "slug": "jute-rug", "price": 80,
            "discountPrice": 65, "stock": 3, "isFeatured": true,
            "category": {"_id": "c1", "name": "Rugs"},
            "attributes": [{"name": "Size", "value": "120x180"}],
            "images": [{"url": "https://cdn.test/rug.jpg", "publicId": "rug"}]
        }))
        .unwrap();
        let form = ProductForm::from_product(&product);
        assert_eq!(form.category, "c1");
        assert_eq!(form.attributes, "Size: 120x180");

        let input = form.to_input(product.images.clone()).unwrap();
        assert_eq!(input.slug, "jute-rug");
        assert_eq!(input.discount_price, Some(Decimal::from(65)));
        assert!(input.is_featured);
        assert_eq!(input.images.len(), 1);
        assert_eq!(image_key(&input.images[0]), "rug");
    }

    #[test]
    fn test_variation_form() {
        let form = VariationForm {
            name: "Size".to_string(),
            value: "Large".to_string(),
            stock: "4".to_string(),
            sku: " ".to_string(),
            ..VariationForm::default()
        };
        let input = form.to_input(ProductId::new("p1")).unwrap();
        assert_eq!(input.stock, 4);
        assert!(input.price.is_none());
        assert!(input.sku.is_none());

        let form = VariationForm {
            price: "0".to_string(),
            ..form
        };
        assert!(form.to_input(ProductId::new("p1")).is_err());
    }
}
