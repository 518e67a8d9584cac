//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use decor_api::requests::ProductQuery;
use decor_core::slice::Slice;
use tracing::instrument;

use crate::state::AppState;
use crate::views::{CategoryCard, Layout, ProductCard};

/// Featured products shown on the home page.
const FEATURED_LIMIT: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured: Slice<ProductCard>,
    pub categories: Slice<CategoryCard>,
}

/// Display the home page.
///
/// The two sections load independently; one failing still renders the other.
#[instrument(skip(state, layout))]
pub async fn home(State(state): State<AppState>, layout: Layout) -> impl IntoResponse {
    let currency = state.currency();
    let query = ProductQuery {
        featured: true,
        limit: Some(FEATURED_LIMIT),
        ..ProductQuery::default()
    };

    let (featured, categories) = tokio::join!(
        Slice::load(async {
            state
                .api()
                .products(&query)
                .await
                .map(|page| page.items.iter().map(|p| ProductCard::new(p, currency)).collect())
        }),
        Slice::load(async {
            state
                .api()
                .categories()
                .await
                .map(|list| list.iter().map(CategoryCard::from).collect())
        }),
    );

    HomeTemplate {
        layout,
        featured,
        categories,
    }
}
