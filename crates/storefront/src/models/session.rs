//! Session-related types.
//!
//! Types stored in the visitor's server-side session.

use decor_api::BackendSession;
use decor_core::UserId;
use decor_core::model::User;
use serde::{Deserialize, Serialize};

/// Session-stored shopper identity.
///
/// Holds the backend session cookie so every backend call made for this
/// visitor is authenticated as them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub backend: BackendSession,
}

impl CurrentUser {
    #[must_use]
    pub fn new(user: User, backend: BackendSession) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            backend,
        }
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

/// Session keys.
pub mod keys {
    /// The signed-in shopper.
    pub const CURRENT_USER: &str = "current_user";

    /// One-shot notice shown on the next rendered page.
    pub const NOTICE: &str = "notice";

    /// Number of units in the cart as of the last cart fetch.
    pub const CART_COUNT: &str = "cart_count";

    /// Coupon the backend accepted for the current checkout.
    pub const APPLIED_COUPON: &str = "applied_coupon";
}
