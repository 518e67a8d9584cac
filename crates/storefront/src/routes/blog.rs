//! Blog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use decor_core::slice::Slice;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::views::{BlogCard, Layout, Pagination, short_date};

/// Number of recent posts to show in sidebar.
const RECENT_POSTS_COUNT: usize = 3;

#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    #[serde(default, deserialize_with = "crate::routes::empty_string_as_none")]
    pub page: Option<u32>,
}

/// Post view for the detail page.
#[derive(Debug, Clone)]
pub struct PostView {
    pub title: String,
    pub cover_image: Option<String>,
    pub author: Option<String>,
    pub published_on: Option<String>,
    pub categories: Vec<String>,
    /// Rich-text body authored in the admin editor.
    pub content_html: String,
}

/// Blog index page template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub layout: Layout,
    pub posts: Slice<BlogCard>,
    pub pagination: Pagination,
}

/// Blog post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub layout: Layout,
    pub post: PostView,
    pub recent_posts: Vec<BlogCard>,
}

/// Display one page of published posts.
#[instrument(skip(state, layout))]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<BlogQuery>,
) -> impl IntoResponse {
    let page = query.page.unwrap_or(1).max(1);

    let mut posts = Slice::new();
    let pagination = match state.api().blogs(page).await {
        Ok(listing) => {
            posts.fulfilled(
                listing
                    .items
                    .iter()
                    .filter(|b| b.published)
                    .map(BlogCard::from)
                    .collect(),
            );
            Pagination::new("/blog", &[], listing.page, listing.pages)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load blog posts");
            posts.rejected(AppError::from(e).user_message());
            Pagination::default()
        }
    };

    BlogIndexTemplate {
        layout,
        posts,
        pagination,
    }
}

/// Display a single blog post by slug.
///
/// # Errors
///
/// Returns 404 if the post doesn't exist or is unpublished.
#[instrument(skip(state, layout))]
pub async fn show(
    State(state): State<AppState>,
    layout: Layout,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let post = state.api().blog_by_slug(&slug).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound(format!("post {slug}"))
        } else {
            AppError::Api(e)
        }
    })?;

    if !post.published {
        return Err(AppError::NotFound(format!("post {slug}")));
    }

    let recent_posts = match state.api().blogs(1).await {
        Ok(listing) => listing
            .items
            .iter()
            .filter(|b| b.published && b.id != post.id)
            .take(RECENT_POSTS_COUNT)
            .map(BlogCard::from)
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load recent posts");
            Vec::new()
        }
    };

    Ok(BlogShowTemplate {
        layout,
        post: PostView {
            title: post.title.clone(),
            cover_image: post.cover_image.clone(),
            author: post.author.clone(),
            published_on: post.created_at.map(short_date),
            categories: post
                .categories
                .iter()
                .filter_map(|c| c.name().map(String::from))
                .collect(),
            content_html: post.content.clone(),
        },
        recent_posts,
    })
}
