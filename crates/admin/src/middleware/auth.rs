//! Authentication middleware and extractors for admin.
//!
//! Panel access needs a [`CurrentAdmin`] in the session whose role is still
//! `admin`. Login only stores admins, so a non-admin in the session means the
//! session predates a role change on the backend.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentAdmin, session_keys};

/// Extractor that requires admin authentication.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when admin authentication is required.
pub enum AdminAuthRejection {
    /// Nobody is signed in.
    RedirectToLogin,
    /// The session layer is not installed.
    Unauthorized,
    /// Signed in, but without the admin role.
    Forbidden,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "Only administrators can access this panel",
            )
                .into_response(),
        }
    }
}

async fn current_admin(session: &Session) -> Option<CurrentAdmin> {
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::Unauthorized)?;

        let admin = current_admin(session)
            .await
            .ok_or(AdminAuthRejection::RedirectToLogin)?;

        if !admin.is_admin() {
            tracing::warn!(user_id = %admin.id, "Non-admin session on admin panel");
            return Err(AdminAuthRejection::Forbidden);
        }

        Ok(Self(admin))
    }
}

/// Extractor that optionally gets the current admin.
///
/// Unlike `RequireAdminAuth`, this does not reject the request if the admin is not logged in.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<Session>() {
            Some(session) => current_admin(session).await,
            None => None,
        };

        Ok(Self(admin))
    }
}

/// Helper to set the current admin in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use decor_api::BackendSession;
    use decor_core::{UserId, UserRole};
    use tower_sessions::MemoryStore;

    use super::*;

    fn admin(role: UserRole) -> CurrentAdmin {
        CurrentAdmin {
            id: UserId::new("a1"),
            email: "ops@example.com".to_string(),
            name: "Ops".to_string(),
            role,
            backend: BackendSession::new("token=adm"),
        }
    }

    fn parts_with(session: Session) -> Parts {
        let (mut parts, ()) = Request::builder().uri("/orders").body(()).unwrap().into_parts();
        parts.extensions.insert(session);
        parts
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_admin_passes() {
        let session = session();
        set_current_admin(&session, &admin(UserRole::Admin)).await.unwrap();

        let mut parts = parts_with(session);
        let Ok(RequireAdminAuth(admin)) =
            RequireAdminAuth::from_request_parts(&mut parts, &()).await
        else {
            panic!("expected an admin");
        };
        assert_eq!(admin.backend.cookie_header(), "token=adm");
    }

    #[tokio::test]
    async fn test_anonymous_is_sent_to_login() {
        let mut parts = parts_with(session());
        let rejection = RequireAdminAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(rejection.into_response().status().is_redirection());
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let session = session();
        set_current_admin(&session, &admin(UserRole::User)).await.unwrap();

        let mut parts = parts_with(session);
        let rejection = RequireAdminAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_logout_clears_admin() {
        let session = session();
        set_current_admin(&session, &admin(UserRole::Admin)).await.unwrap();
        clear_current_admin(&session).await.unwrap();
        assert!(current_admin(&session).await.is_none());
    }
}
