//! Product route handlers.

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
use crate::state::AppState;
use crate::views::{Layout, Pagination, ProductCard, ProductDetail, SelectOption};

/// Products per listing page.
pub const PAGE_SIZE: u32 = 12;

/// Related products shown under a product.
const RELATED_LIMIT: usize = 4;
/// One extra so the product itself can be filtered out.
const RELATED_FETCH: u32 = 5;

/// Sort keys understood by the backend, with their labels.
pub const SORT_OPTIONS: [(&str, &str); 5] = [
    ("", "Featured"),
    ("newest", "Newest"),
    ("price_asc", "Price: low to high"),
    ("price_desc", "Price: high to low"),
    ("name_asc", "Name: A to Z"),
];

/// Listing filters from the query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "crate::routes::empty_string_as_none")]
    pub page: Option<u32>,
}

impl ListingQuery {
    fn non_empty(value: Option<&String>) -> Option<&str> {
        value.map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    /// Backend query for this listing page.
    #[must_use]
    pub fn to_product_query(&self) -> ProductQuery {
        let sort = Self::non_empty(self.sort.as_ref())
            .filter(|s| SORT_OPTIONS.iter().any(|(key, _)| key == s));
        ProductQuery {
            category: Self::non_empty(self.category.as_ref()).map(String::from),
            sub_category: Self::non_empty(self.sub_category.as_ref()).map(String::from),
            search: Self::non_empty(self.q.as_ref()).map(String::from),
            sort: sort.map(String::from),
            featured: false,
            page: Some(self.page.unwrap_or(1).max(1)),
            limit: Some(PAGE_SIZE),
        }
    }

    fn pagination(&self, path: &str, page: u32, pages: u32) -> Pagination {
        Pagination::new(
            path,
            &[
                ("category", Self::non_empty(self.category.as_ref())),
                ("sub_category", Self::non_empty(self.sub_category.as_ref())),
                ("q", Self::non_empty(self.q.as_ref())),
                ("sort", Self::non_empty(self.sort.as_ref())),
            ],
            page,
            pages,
        )
    }

    fn sort_options(&self) -> Vec<SelectOption> {
        let current = Self::non_empty(self.sort.as_ref());
        SORT_OPTIONS
            .iter()
            .map(|(value, label)| SelectOption::new(*value, *label, current))
            .collect()
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Slice<ProductCard>,
    pub total: u64,
    pub search: String,
    pub category_options: Vec<SelectOption>,
    pub sub_category_options: Vec<SelectOption>,
    pub sort_options: Vec<SelectOption>,
    pub pagination: Pagination,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductDetail,
    pub related: Vec<ProductCard>,
    pub signed_in: bool,
}

/// Display product listing.
#[instrument(skip(state, layout))]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let currency = state.currency();
    let product_query = query.to_product_query();
    let category = product_query.category.clone();

    let (listing, categories, sub_categories) = tokio::join!(
        state.api().products(&product_query),
        state.api().categories(),
        state.api().sub_categories(category.as_deref()),
    );

    let mut products = Slice::new();
    let (total, page, pages) = match listing {
        Ok(listing) => {
            products.fulfilled(
                listing
                    .items
                    .iter()
                    .map(|p| ProductCard::new(p, currency))
                    .collect(),
            );
            (listing.total, listing.page, listing.pages)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load product listing");
            products.rejected(AppError::from(e).user_message());
            (0, 1, 1)
        }
    };

    let current_category = category.as_deref();
    let mut category_options = vec![SelectOption::new("", "All categories", current_category)];
    if let Ok(categories) = categories {
        category_options.extend(
            categories
                .iter()
                .map(|c| SelectOption::new(c.id.as_str(), c.name.as_str(), current_category)),
        );
    }

    let current_sub = product_query.sub_category.as_deref();
    let mut sub_category_options = Vec::new();
    if category.is_some()
        && let Ok(subs) = sub_categories
        && !subs.is_empty()
    {
        sub_category_options.push(SelectOption::new("", "All", current_sub));
        sub_category_options.extend(
            subs.iter()
                .map(|s| SelectOption::new(s.id.as_str(), s.name.as_str(), current_sub)),
        );
    }

    ProductsIndexTemplate {
        layout,
        products,
        total,
        search: query.q.clone().unwrap_or_default(),
        category_options,
        sub_category_options,
        sort_options: query.sort_options(),
        pagination: query.pagination("/products", page, pages),
    }
}

/// Display product detail page.
#[instrument(skip(state, layout))]
pub async fn show(
    State(state): State<AppState>,
    layout: Layout,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let currency = state.currency();
    let product = state.api().product_by_slug(&slug).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound(format!("product {slug}"))
        } else {
            AppError::Api(e)
        }
    })?;

    let related = match product.category.as_ref() {
        Some(category) => {
            let query = ProductQuery {
                category: Some(category.id().to_string()),
                limit: Some(RELATED_FETCH),
                ..ProductQuery::default()
            };
            match state.api().products(&query).await {
                Ok(page) => page
                    .items
                    .iter()
                    .filter(|p| p.id != product.id)
                    .take(RELATED_LIMIT)
                    .map(|p| ProductCard::new(p, currency))
                    .collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load related products");
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    let signed_in = layout.user_name.is_some();
    Ok(ProductShowTemplate {
        layout,
        product: ProductDetail::new(&product, currency),
        related,
        signed_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_query_drops_blank_and_unknown_filters() {
        let query = ListingQuery {
            category: Some("c1".to_string()),
            sub_category: Some("  ".to_string()),
            q: Some(" oak ".to_string()),
            sort: Some("cheapest".to_string()),
            page: Some(0),
        };
        let backend = query.to_product_query();
        assert_eq!(backend.category.as_deref(), Some("c1"));
        assert_eq!(backend.sub_category, None);
        assert_eq!(backend.search.as_deref(), Some("oak"));
        assert_eq!(backend.sort, None);
        assert_eq!(backend.page, Some(1));
        assert_eq!(backend.limit, Some(PAGE_SIZE));
    }

    #[test]
    fn test_sort_options_mark_current() {
        let query = ListingQuery {
            sort: Some("price_desc".to_string()),
            ..ListingQuery::default()
        };
        let selected: Vec<_> = query
            .sort_options()
            .into_iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, vec!["price_desc".to_string()]);
    }

    #[test]
    fn test_pagination_links_keep_search() {
        let query = ListingQuery {
            q: Some("lamp".to_string()),
            ..ListingQuery::default()
        };
        let pages = query.pagination("/products", 1, 2);
        assert_eq!(pages.next.as_deref(), Some("/products?q=lamp&page=2"));
    }
}
