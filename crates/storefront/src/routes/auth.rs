//! Authentication route handlers.
//!
//! Login and registration go through the shop backend. The backend's session
//! cookie is captured from its response and kept in this visitor's session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use decor_api::{ApiError, Login};
use decor_core::Email;
use decor_core::slice::Notice;
use decor_core::validation::validate_registration;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, push_notice, set_current_user};
use crate::models::CurrentUser;
use crate::routes::cart::refresh_cart_count;
use crate::state::AppState;
use crate::views::Layout;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirm: SecretString,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

/// Store the backend login in the session and greet the shopper.
async fn start_session(
    state: &AppState,
    session: &Session,
    login: Login,
    greeting: &str,
) -> Result<Response> {
    let user = CurrentUser::new(login.user, login.session);
    set_current_user(session, &user).await?;
    set_sentry_user(&user.id, Some(&user.email));
    tracing::info!(user_id = %user.id, "Shopper signed in");

    refresh_cart_count(state, session, &user).await;
    push_notice(
        session,
        Notice::success(format!("{greeting}, {}!", user.display_name())),
    )
    .await;
    Ok(Redirect::to("/").into_response())
}

fn login_failure(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized => INVALID_CREDENTIALS.to_string(),
        e if e.is_client_error() => e.user_message(),
        e => {
            tracing::warn!(error = %e, "Login request failed");
            e.user_message()
        }
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(layout: Layout) -> Response {
    if layout.user_name.is_some() {
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

    match state
        .api()
        .login(email.as_str(), form.password.expose_secret())
        .await
    {
        Ok(login) => start_session(&state, &session, login, "Welcome back").await,
        Err(e) => Ok(rejected(layout, login_failure(&e))),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(layout: Layout) -> Response {
    if layout.user_name.is_some() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate {
        layout,
        name: String::new(),
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission. The new account is signed in.
#[instrument(skip(state, session, layout, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let name = form.name.trim();
    let rejected = |layout: Layout, error: String| {
        RegisterTemplate {
            layout,
            name: name.to_string(),
            email: form.email.trim().to_string(),
            error: Some(error),
        }
        .into_response()
    };

    let email = match validate_registration(name, &form.email, form.password.expose_secret()) {
        Ok(email) => email,
        Err(e) => return Ok(rejected(layout, e.to_string())),
    };
    if form.password.expose_secret() != form.password_confirm.expose_secret() {
        return Ok(rejected(layout, "Passwords do not match.".to_string()));
    }

    match state
        .api()
        .register(name, email.as_str(), form.password.expose_secret())
        .await
    {
        Ok(login) => start_session(&state, &session, login, "Welcome").await,
        Err(e) => {
            if !e.is_client_error() {
                tracing::warn!(error = %e, "Registration request failed");
            }
            Ok(rejected(layout, e.user_message()))
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Ends the backend session (best effort) and clears this visitor's session.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Response {
    if let Some(user) = user
        && let Err(e) = state.api().logout(&user.backend).await
    {
        tracing::warn!(error = %e, "Failed to end backend session");
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failure_messages() {
        assert_eq!(login_failure(&ApiError::Unauthorized), INVALID_CREDENTIALS);
        assert_eq!(
            login_failure(&ApiError::from_status(400, Some("Account is locked".to_string()))),
            "Account is locked"
        );
    }
}
