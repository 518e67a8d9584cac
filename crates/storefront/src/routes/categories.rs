//! Category route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use decor_api::requests::ProductQuery;
use decor_core::slice::Slice;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::routes::products::PAGE_SIZE;
use crate::state::AppState;
use crate::views::{CategoryCard, Layout, Pagination, ProductCard};

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(default, deserialize_with = "crate::routes::empty_string_as_none")]
    pub page: Option<u32>,
}

/// Category listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub layout: Layout,
    pub categories: Slice<CategoryCard>,
}

/// Category detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/show.html")]
pub struct CategoryShowTemplate {
    pub layout: Layout,
    pub category: CategoryCard,
    pub meta_description: Option<String>,
    pub sub_categories: Vec<CategoryCard>,
    pub products: Slice<ProductCard>,
    pub pagination: Pagination,
}

/// Display all categories.
#[instrument(skip(state, layout))]
pub async fn index(State(state): State<AppState>, layout: Layout) -> impl IntoResponse {
    let categories = Slice::load(async {
        state
            .api()
            .categories()
            .await
            .map(|list| list.iter().map(CategoryCard::from).collect())
    })
    .await;

    CategoriesIndexTemplate { layout, categories }
}

/// Display one category with its sub-categories and products.
#[instrument(skip(state, layout))]
pub async fn show(
    State(state): State<AppState>,
    layout: Layout,
    Path(slug): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse> {
    let currency = state.currency();
    let category = state.api().category_by_slug(&slug).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound(format!("category {slug}"))
        } else {
            AppError::Api(e)
        }
    })?;

    let product_query = ProductQuery {
        category: Some(category.id.to_string()),
        page: Some(query.page.unwrap_or(1).max(1)),
        limit: Some(PAGE_SIZE),
        ..ProductQuery::default()
    };

    let (sub_categories, listing) = tokio::join!(
        state.api().sub_categories(Some(category.id.as_str())),
        state.api().products(&product_query),
    );

    let sub_categories = sub_categories
        .map(|subs| subs.iter().map(CategoryCard::from).collect())
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load sub-categories");
            Vec::new()
        });

    let mut products = Slice::new();
    let (page, pages) = match listing {
        Ok(listing) => {
            products.fulfilled(
                listing
                    .items
                    .iter()
                    .map(|p| ProductCard::new(p, currency))
                    .collect(),
            );
            (listing.page, listing.pages)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load category products");
            products.rejected(AppError::from(e).user_message());
            (1, 1)
        }
    };

    Ok(CategoryShowTemplate {
        layout,
        meta_description: category.meta_description.clone(),
        pagination: Pagination::new(&format!("/categories/{slug}"), &[], page, pages),
        category: CategoryCard::from(&category),
        sub_categories,
        products,
    })
}
