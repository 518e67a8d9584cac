//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state.

use decor_api::BackendSession;
use decor_core::model::User;
use decor_core::{UserId, UserRole};
use serde::{Deserialize, Serialize};

/// Session-stored admin identity.
///
/// Holds the backend session cookie captured at login; every backend call
/// made from the panel runs as this admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Backend user ID.
    pub id: UserId,
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role as reported by the backend at login.
    pub role: UserRole,
    pub backend: BackendSession,
}

impl CurrentAdmin {
    #[must_use]
    pub fn new(user: User, backend: BackendSession) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            backend,
        }
    }

    /// Whether the stored role still grants panel access.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Name shown in the header, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// One-shot notice shown on the next rendered page.
    pub const NOTICE: &str = "notice";
}
