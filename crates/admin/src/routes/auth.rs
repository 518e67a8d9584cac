//! Authentication route handlers for admin.
//!
//! Sign-in goes through the shop backend. Only accounts with the admin role
//! get a panel session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use decor_api::ApiError;
use decor_core::Email;
use decor_core::slice::Notice;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAdminAuth, clear_current_admin, push_notice, set_current_admin};
use crate::models::CurrentAdmin;
use crate::state::AppState;
use crate::views::Layout;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const NOT_AN_ADMIN: &str = "This account does not have admin access.";

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub error: Option<String>,
}

fn login_failure(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized => INVALID_CREDENTIALS.to_string(),
        ApiError::Forbidden => NOT_AN_ADMIN.to_string(),
        e if e.is_client_error() => e.user_message(),
        e => {
            tracing::warn!(error = %e, "Admin login request failed");
            e.user_message()
        }
    }
}

/// Display the login page.
pub async fn login_page(layout: Layout) -> Response {
    if layout.admin_name.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        layout,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, layout, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let rejected = |layout: Layout, error: String| {
        LoginTemplate {
            layout,
            email: form.email.trim().to_string(),
            error: Some(error),
        }
        .into_response()
    };

    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => return Ok(rejected(layout, e.to_string())),
    };

    let login = match state
        .api()
        .login(email.as_str(), form.password.expose_secret())
        .await
    {
        Ok(login) => login,
        Err(e) => {
            if matches!(e, ApiError::Forbidden) {
                tracing::warn!(email = %email.as_str(), "Non-admin account tried to sign in");
            }
            return Ok(rejected(layout, login_failure(&e)));
        }
    };

    let admin = CurrentAdmin::new(login.user, login.session);
    set_current_admin(&session, &admin).await?;
    set_sentry_user(&admin.id, Some(&admin.email));
    tracing::info!(admin_id = %admin.id, "Admin signed in");

    push_notice(
        &session,
        Notice::success(format!("Signed in as {}.", admin.display_name())),
    )
    .await;
    Ok(Redirect::to("/").into_response())
}

/// Handle logout.
///
/// Ends the backend session (best effort) and clears the panel session.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    OptionalAdminAuth(admin): OptionalAdminAuth,
    session: Session,
) -> Response {
    if let Some(admin) = admin
        && let Err(e) = state.api().logout(&admin.backend).await
    {
        tracing::warn!(error = %e, "Failed to end backend session");
    }

    if let Err(e) = clear_current_admin(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();

    Redirect::to("/auth/login").into_response()
}
