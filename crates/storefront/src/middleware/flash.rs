//! One-shot notices carried across a redirect.
//!
//! A mutating handler pushes a [`Notice`] and redirects; the next rendered
//! page takes it out of the session and shows it once.

use decor_core::slice::Notice;
use tower_sessions::Session;

use crate::models::session_keys;

/// Queue a notice for the next rendered page.
///
/// Session failures are logged and swallowed.
pub async fn push_notice(session: &Session, notice: Notice) {
    if let Err(e) = session.insert(session_keys::NOTICE, notice).await {
        tracing::warn!(error = %e, "Failed to store notice in session");
    }
}

/// Take the pending notice, if any.
pub async fn take_notice(session: &Session) -> Option<Notice> {
    session
        .remove::<Notice>(session_keys::NOTICE)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read notice from session");
            None
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_notice_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        push_notice(&session, Notice::success("Added to cart")).await;

        let notice = take_notice(&session).await.unwrap();
        assert_eq!(notice.message, "Added to cart");
        assert!(take_notice(&session).await.is_none());
    }
}
