//! Blog post route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use decor_api::requests::BlogInput;
use decor_core::model::{Blog, Category};
use decor_core::slice::Slice;
use decor_core::slug::slug_or_derive;
use decor_core::validation::{ValidationError, ValidationResult, validate_blog_title};
use decor_core::{BlogId, CategoryId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::CurrentAdmin;
use crate::routes::{
    empty_string_as_none, form_error, into_slice, non_blank, not_found_as, redirect_with_error,
    redirect_with_notice,
};
use crate::state::AppState;
use crate::views::{BlogRow, Layout, Pagination, SelectOption};

/// Longest accepted excerpt.
const MAX_EXCERPT_LEN: usize = 500;

/// List page query.
#[derive(Debug, Default, Deserialize)]
pub struct BlogsQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u32>,
}

/// Blog form as typed.
///
/// Parsed from raw pairs because the category picker may repeat its field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogForm {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub cover_image: String,
    pub author: String,
    pub categories: Vec<String>,
    pub published: bool,
}

impl BlogForm {
    /// Collect submitted fields. Unknown fields are ignored.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "title" => form.title = value,
                "slug" => form.slug = value,
                "content" => form.content = value,
                "excerpt" => form.excerpt = value,
                "cover_image" => form.cover_image = value,
                "author" => form.author = value,
                "categories" if !value.trim().is_empty() => form.categories.push(value),
                "published" => form.published = true,
                _ => {}
            }
        }
        form
    }

    #[must_use]
    pub fn from_blog(blog: &Blog) -> Self {
        Self {
            title: blog.title.clone(),
            slug: blog.slug.clone(),
            content: blog.content.clone(),
            excerpt: blog.excerpt.clone().unwrap_or_default(),
            cover_image: blog.cover_image.clone().unwrap_or_default(),
            author: blog.author.clone().unwrap_or_default(),
            categories: blog.categories.iter().map(|c| c.id().to_string()).collect(),
            published: blog.published,
        }
    }

    /// Validate and build the payload.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn to_input(&self) -> ValidationResult<BlogInput> {
        let title = validate_blog_title(&self.title)?;
        let content = self.content.trim();
        if content.is_empty() {
            return Err(ValidationError::Required { field: "content" });
        }
        if self.excerpt.trim().chars().count() > MAX_EXCERPT_LEN {
            return Err(ValidationError::TooLong {
                field: "excerpt",
                max: MAX_EXCERPT_LEN,
            });
        }

        Ok(BlogInput {
            title: title.to_string(),
            slug: slug_or_derive(non_blank(&self.slug).as_deref(), title),
            content: content.to_string(),
            excerpt: non_blank(&self.excerpt),
            cover_image: non_blank(&self.cover_image),
            categories: self
                .categories
                .iter()
                .map(|id| CategoryId::new(id.trim()))
                .collect(),
            author: non_blank(&self.author),
            published: self.published,
        })
    }
}

/// Category picker options with every chosen category selected.
fn category_options(categories: &[Category], chosen: &[String]) -> Vec<SelectOption> {
    categories
        .iter()
        .map(|c| SelectOption {
            value: c.id.to_string(),
            label: c.name.clone(),
            selected: chosen.iter().any(|id| id == c.id.as_str()),
        })
        .collect()
}

/// Blog list template.
#[derive(Template, WebTemplate)]
#[template(path = "blogs/index.html")]
pub struct BlogsTemplate {
    pub layout: Layout,
    pub rows: Slice<BlogRow>,
    pub total: u64,
    pub pagination: Pagination,
}

/// New/edit blog form template.
#[derive(Template, WebTemplate)]
#[template(path = "blogs/form.html")]
pub struct BlogFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub form: BlogForm,
    pub error: Option<String>,
    pub category_options: Vec<SelectOption>,
}

async fn render_form(
    state: &AppState,
    admin: &CurrentAdmin,
    layout: Layout,
    form: BlogForm,
    error: Option<String>,
    id: Option<&BlogId>,
) -> Result<Response> {
    let categories = into_slice(state.api().categories(&admin.backend).await, "categories")?;
    let (heading, action) = match id {
        Some(id) => (format!("Edit {}", form.title), format!("/blogs/{id}")),
        None => ("New post".to_string(), "/blogs".to_string()),
    };

    Ok(BlogFormTemplate {
        layout,
        heading,
        action,
        category_options: category_options(&categories.items, &form.categories),
        form,
        error,
    }
    .into_response())
}

/// List blog posts.
#[instrument(skip(state, admin, layout))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Query(query): Query<BlogsQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let (rows, total, pages) = match state.api().blogs(&admin.backend, page).await {
        Ok(listing) => (Ok(listing.items), listing.total, listing.pages),
        Err(e) => (Err(e), 0, 1),
    };
    let rows = into_slice(rows, "blog posts")?.map(|b| BlogRow::from(&b));

    Ok(BlogsTemplate {
        layout,
        rows,
        total,
        pagination: Pagination::new("/blogs", &[], page, pages),
    })
}

/// Display the new post form.
#[instrument(skip(state, admin, layout))]
pub async fn new(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<Response> {
    render_form(&state, &admin, layout, BlogForm::default(), None, None).await
}

/// Create a post.
#[instrument(skip(state, admin, session, layout, pairs))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let form = BlogForm::from_pairs(pairs);
    let input = match form.to_input() {
        Ok(input) => input,
        Err(e) => return render_form(&state, &admin, layout, form, Some(e.to_string()), None).await,
    };

    match state.api().create_blog(&admin.backend, &input).await {
        Ok(blog) => {
            tracing::info!(blog_id = %blog.id, published = blog.published, "Blog post created");
            Ok(redirect_with_notice(&session, format!("Post \"{}\" created.", blog.title), "/blogs").await)
        }
        Err(e) => {
            let message = form_error(e)?;
            render_form(&state, &admin, layout, form, Some(message), None).await
        }
    }
}

/// Display the edit form.
#[instrument(skip(state, admin, layout))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<BlogId>,
) -> Result<Response> {
    let blog = state
        .api()
        .blog(&admin.backend, &id)
        .await
        .map_err(not_found_as(format!("blog post {id}")))?;
    render_form(&state, &admin, layout, BlogForm::from_blog(&blog), None, Some(&id)).await
}

/// Save a post.
#[instrument(skip(state, admin, session, layout, pairs))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Path(id): Path<BlogId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let form = BlogForm::from_pairs(pairs);
    let error = match form.to_input() {
        Ok(input) => match state.api().update_blog(&admin.backend, &id, &input).await {
            Ok(blog) => {
                tracing::info!(blog_id = %id, published = blog.published, "Blog post updated");
                return Ok(redirect_with_notice(
                    &session,
                    format!("Post \"{}\" saved.", blog.title),
                    "/blogs",
                )
                .await);
            }
            Err(e) => form_error(e)?,
        },
        Err(e) => e.to_string(),
    };
    render_form(&state, &admin, layout, form, Some(error), Some(&id)).await
}

/// Delete a post.
#[instrument(skip(state, admin, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<BlogId>,
) -> Result<Response> {
    match state.api().delete_blog(&admin.backend, &id).await {
        Ok(()) => Ok(redirect_with_notice(&session, "Post deleted.", "/blogs").await),
        Err(e) => redirect_with_error(&session, e, "/blogs").await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_pairs_collects_repeated_categories() {
        let form = BlogForm::from_pairs(pairs(&[
            ("title", "Styling a Bookshelf"),
            ("content", "Start with the big pieces."),
            ("categories", "c1"),
            ("categories", ""),
            ("categories", "c2"),
            ("published", "on"),
        ]));
        assert_eq!(form.categories, ["c1", "c2"]);
        assert!(form.published);

        let input = form.to_input().unwrap();
        assert_eq!(input.slug, "styling-a-bookshelf");
        assert_eq!(input.categories, [CategoryId::new("c1"), CategoryId::new("c2")]);
        assert!(input.excerpt.is_none());
    }

    #[test]
    fn test_unticked_checkbox_is_draft() {
        let form = BlogForm::from_pairs(pairs(&[("title", "Draft"), ("content", "Body")]));
        assert!(!form.to_input().unwrap().published);
    }

    #[test]
    fn test_content_required() {
        let form = BlogForm::from_pairs(pairs(&[("title", "Empty"), ("content", "   ")]));
        assert_eq!(
            form.to_input().unwrap_err(),
            ValidationError::Required { field: "content" }
        );
    }

    #[test]
    fn test_category_options_mark_every_choice() {
        let categories: Vec<Category> = serde_json::from_value(serde_json::json!([
            {"_id": "c1", "name": "Living"},
            {"_id": "c2", "name": "Bedroom"},
            {"_id": "c3", "name": "Outdoor"},
        ]))
        .unwrap();
        let options = category_options(&categories, &["c1".to_string(), "c3".to_string()]);
        let selected: Vec<bool> = options.iter().map(|o| o.selected).collect();
        assert_eq!(selected, [true, false, true]);
    }
}
