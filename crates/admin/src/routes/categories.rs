//! Category and sub-category route handlers.
//!
//! Both sections share one form and one pair of templates. Sub-categories
//! additionally need a parent category.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use decor_api::requests::CategoryInput;
use decor_core::model::{Category, SubCategory};
use decor_core::slice::Slice;
use decor_core::slug::slug_or_derive;
use decor_core::validation::{
    MAX_TITLE_LEN, ValidationError, ValidationResult, validate_category_name, validate_text,
};
use decor_core::{CategoryId, SubCategoryId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::CurrentAdmin;
use crate::routes::{
    form_error, into_slice, non_blank, not_found_as, redirect_with_error, redirect_with_notice,
};
use crate::state::AppState;
use crate::views::{CategoryRow, Layout, SelectOption, record_options};

/// Longest accepted meta description.
const MAX_META_DESCRIPTION_LEN: usize = 320;

/// Which of the two sections a page belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub title: &'static str,
    pub noun: &'static str,
    pub path: &'static str,
    pub has_parent: bool,
}

pub const CATEGORIES: Section = Section {
    title: "Categories",
    noun: "Category",
    path: "/categories",
    has_parent: false,
};

pub const SUB_CATEGORIES: Section = Section {
    title: "Sub-categories",
    noun: "Sub-category",
    path: "/sub-categories",
    has_parent: true,
};

// =============================================================================
// Form
// =============================================================================

/// Category form as typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: String,
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: String,
    /// Parent category id (sub-categories only).
    pub category: String,
}

impl CategoryForm {
    #[must_use]
    pub fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone().unwrap_or_default(),
            image: category.image.clone().unwrap_or_default(),
            meta_title: category.meta_title.clone().unwrap_or_default(),
            meta_description: category.meta_description.clone().unwrap_or_default(),
            meta_keywords: category.meta_keywords.clone().unwrap_or_default(),
            category: String::new(),
        }
    }

    #[must_use]
    pub fn from_sub_category(sub: &SubCategory) -> Self {
        Self {
            name: sub.name.clone(),
            slug: sub.slug.clone(),
            description: sub.description.clone().unwrap_or_default(),
            image: sub.image.clone().unwrap_or_default(),
            meta_title: sub.meta_title.clone().unwrap_or_default(),
            meta_description: sub.meta_description.clone().unwrap_or_default(),
            meta_keywords: sub.meta_keywords.clone().unwrap_or_default(),
            category: sub
                .category
                .as_ref()
                .map(|c| c.id().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate and build the payload for `section`.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn to_input(&self, section: Section) -> ValidationResult<CategoryInput> {
        let name = validate_category_name(&self.name)?;

        if let Some(title) = non_blank(&self.meta_title) {
            validate_text("meta title", &title, MAX_TITLE_LEN)?;
        }
        if let Some(description) = non_blank(&self.meta_description) {
            validate_text("meta description", &description, MAX_META_DESCRIPTION_LEN)?;
        }
        if let Some(image) = non_blank(&self.image)
            && url::Url::parse(&image).is_err()
        {
            return Err(ValidationError::InvalidFormat {
                field: "image",
                reason: "must be a full URL",
            });
        }

        let category = if section.has_parent {
            Some(
                non_blank(&self.category)
                    .map(CategoryId::new)
                    .ok_or(ValidationError::Required {
                        field: "parent category",
                    })?,
            )
        } else {
            None
        };

        Ok(CategoryInput {
            name: name.to_string(),
            slug: slug_or_derive(non_blank(&self.slug).as_deref(), name),
            description: non_blank(&self.description),
            image: non_blank(&self.image),
            meta_title: non_blank(&self.meta_title),
            meta_description: non_blank(&self.meta_description),
            meta_keywords: non_blank(&self.meta_keywords),
            category,
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Category list template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesTemplate {
    pub layout: Layout,
    pub section: Section,
    pub rows: Slice<CategoryRow>,
}

/// New/edit category form template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/form.html")]
pub struct CategoryFormTemplate {
    pub layout: Layout,
    pub section: Section,
    pub heading: String,
    pub action: String,
    pub form: CategoryForm,
    pub error: Option<String>,
    pub parent_options: Vec<SelectOption>,
}

/// Render the form page. `id` is set when editing.
async fn render_form(
    state: &AppState,
    admin: &CurrentAdmin,
    layout: Layout,
    section: Section,
    form: CategoryForm,
    error: Option<String>,
    id: Option<&str>,
) -> Result<Response> {
    let parent_options = if section.has_parent {
        let parents = into_slice(state.api().categories(&admin.backend).await, "categories")?;
        record_options(&parents.items, &form.category, "Choose a category")
    } else {
        Vec::new()
    };

    let (heading, action) = match id {
        Some(id) => (
            format!("Edit {}", form.name),
            format!("{}/{id}", section.path),
        ),
        None => (format!("New {}", section.noun.to_lowercase()), section.path.to_string()),
    };

    Ok(CategoryFormTemplate {
        layout,
        section,
        heading,
        action,
        form,
        error,
        parent_options,
    }
    .into_response())
}

/// Redirect after a save, or re-render the form with the backend's message.
#[allow(clippy::too_many_arguments)]
async fn finish_save(
    state: &AppState,
    admin: &CurrentAdmin,
    session: &Session,
    layout: Layout,
    section: Section,
    form: CategoryForm,
    id: Option<&str>,
    saved: std::result::Result<String, decor_api::ApiError>,
) -> Result<Response> {
    match saved {
        Ok(name) => {
            tracing::info!(section = section.title, name = %name, "Category saved");
            Ok(redirect_with_notice(
                session,
                format!("{} \"{name}\" saved.", section.noun),
                section.path,
            )
            .await)
        }
        Err(e) => {
            let message = form_error(e)?;
            render_form(state, admin, layout, section, form, Some(message), id).await
        }
    }
}

// =============================================================================
// Category Routes
// =============================================================================

/// List categories.
#[instrument(skip(state, admin, layout))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let rows = into_slice(state.api().categories(&admin.backend).await, "categories")?
        .map(|c| CategoryRow::from(&c));
    Ok(CategoriesTemplate {
        layout,
        section: CATEGORIES,
        rows,
    })
}

/// Display the new category form.
#[instrument(skip(state, admin, layout))]
pub async fn new(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<Response> {
    render_form(&state, &admin, layout, CATEGORIES, CategoryForm::default(), None, None).await
}

/// Create a category.
#[instrument(skip(state, admin, session, layout, form))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let input = match form.to_input(CATEGORIES) {
        Ok(input) => input,
        Err(e) => {
            return render_form(&state, &admin, layout, CATEGORIES, form, Some(e.to_string()), None)
                .await;
        }
    };
    let saved = state
        .api()
        .create_category(&admin.backend, &input)
        .await
        .map(|c| c.name);
    finish_save(&state, &admin, &session, layout, CATEGORIES, form, None, saved).await
}

/// Display the edit form.
#[instrument(skip(state, admin, layout))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<CategoryId>,
) -> Result<Response> {
    let category = state
        .api()
        .category(&admin.backend, &id)
        .await
        .map_err(not_found_as(format!("category {id}")))?;
    let form = CategoryForm::from_category(&category);
    render_form(&state, &admin, layout, CATEGORIES, form, None, Some(id.as_str())).await
}

/// Save a category.
#[instrument(skip(state, admin, session, layout, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Path(id): Path<CategoryId>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let input = match form.to_input(CATEGORIES) {
        Ok(input) => input,
        Err(e) => {
            let error = Some(e.to_string());
            return render_form(&state, &admin, layout, CATEGORIES, form, error, Some(id.as_str()))
                .await;
        }
    };
    let saved = state
        .api()
        .update_category(&admin.backend, &id, &input)
        .await
        .map(|c| c.name);
    finish_save(&state, &admin, &session, layout, CATEGORIES, form, Some(id.as_str()), saved).await
}

/// Delete a category.
#[instrument(skip(state, admin, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<CategoryId>,
) -> Result<Response> {
    match state.api().delete_category(&admin.backend, &id).await {
        Ok(()) => Ok(redirect_with_notice(&session, "Category deleted.", CATEGORIES.path).await),
        Err(e) => redirect_with_error(&session, e, CATEGORIES.path).await,
    }
}

// =============================================================================
// Sub-category Routes
// =============================================================================

/// List sub-categories.
#[instrument(skip(state, admin, layout))]
pub async fn sub_index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let rows = into_slice(
        state.api().sub_categories(&admin.backend).await,
        "sub-categories",
    )?
    .map(|s| CategoryRow::from(&s));
    Ok(CategoriesTemplate {
        layout,
        section: SUB_CATEGORIES,
        rows,
    })
}

/// Display the new sub-category form.
#[instrument(skip(state, admin, layout))]
pub async fn sub_new(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<Response> {
    render_form(&state, &admin, layout, SUB_CATEGORIES, CategoryForm::default(), None, None).await
}

/// Create a sub-category.
#[instrument(skip(state, admin, session, layout, form))]
pub async fn sub_create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let input = match form.to_input(SUB_CATEGORIES) {
        Ok(input) => input,
        Err(e) => {
            let error = Some(e.to_string());
            return render_form(&state, &admin, layout, SUB_CATEGORIES, form, error, None).await;
        }
    };
    let saved = state
        .api()
        .create_sub_category(&admin.backend, &input)
        .await
        .map(|s| s.name);
    finish_save(&state, &admin, &session, layout, SUB_CATEGORIES, form, None, saved).await
}

/// Display the sub-category edit form.
#[instrument(skip(state, admin, layout))]
pub async fn sub_edit(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<SubCategoryId>,
) -> Result<Response> {
    let sub = state
        .api()
        .sub_category(&admin.backend, &id)
        .await
        .map_err(not_found_as(format!("sub-category {id}")))?;
    let form = CategoryForm::from_sub_category(&sub);
    render_form(&state, &admin, layout, SUB_CATEGORIES, form, None, Some(id.as_str())).await
}

/// Save a sub-category.
#[instrument(skip(state, admin, session, layout, form))]
pub async fn sub_update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Path(id): Path<SubCategoryId>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let input = match form.to_input(SUB_CATEGORIES) {
        Ok(input) => input,
        Err(e) => {
            let error = Some(e.to_string());
            return render_form(
                &state,
                &admin,
                layout,
                SUB_CATEGORIES,
                form,
                error,
                Some(id.as_str()),
            )
            .await;
        }
    };
    let saved = state
        .api()
        .update_sub_category(&admin.backend, &id, &input)
        .await
        .map(|s| s.name);
    finish_save(
        &state,
        &admin,
        &session,
        layout,
        SUB_CATEGORIES,
        form,
        Some(id.as_str()),
        saved,
    )
    .await
}

/// Delete a sub-category.
#[instrument(skip(state, admin, session))]
pub async fn sub_delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<SubCategoryId>,
) -> Result<Response> {
    match state.api().delete_sub_category(&admin.backend, &id).await {
        Ok(()) => {
            Ok(redirect_with_notice(&session, "Sub-category deleted.", SUB_CATEGORIES.path).await)
        }
        Err(e) => redirect_with_error(&session, e, SUB_CATEGORIES.path).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> CategoryForm {
        CategoryForm {
            name: "Wall Art".to_string(),
            meta_keywords: " ".to_string(),
            ..CategoryForm::default()
        }
    }

    #[test]
    fn test_category_input_derives_slug() {
        let input = form().to_input(CATEGORIES).unwrap();
        assert_eq!(input.slug, "wall-art");
        assert!(input.meta_keywords.is_none());
        assert!(input.category.is_none());
    }

    #[test]
    fn test_sub_category_requires_parent() {
        let err = form().to_input(SUB_CATEGORIES).unwrap_err();
        assert_eq!(err.field(), "parent category");

        let with_parent = CategoryForm {
            category: "c1".to_string(),
            ..form()
        };
        let input = with_parent.to_input(SUB_CATEGORIES).unwrap();
        assert_eq!(input.category, Some(CategoryId::new("c1")));
    }

    #[test]
    fn test_category_image_must_be_url() {
        let bad = CategoryForm {
            image: "wall.jpg".to_string(),
            ..form()
        };
        assert_eq!(bad.to_input(CATEGORIES).unwrap_err().field(), "image");
    }

    #[test]
    fn test_blank_name_rejected() {
        let blank = CategoryForm {
            name: "  ".to_string(),
            ..form()
        };
        assert_eq!(
            blank.to_input(CATEGORIES).unwrap_err(),
            ValidationError::Required { field: "name" }
        );
    }
}
