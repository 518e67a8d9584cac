//! One-shot notices carried across a redirect.

use decor_core::slice::Notice;
use tower_sessions::Session;

use crate::models::session_keys;

/// Queue a notice for the next rendered page. Session failures are logged.
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

    use decor_core::slice::NoticeLevel;
    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_latest_notice_wins_and_is_taken_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        push_notice(&session, Notice::success("Product saved")).await;
        push_notice(&session, Notice::error("Image upload failed")).await;

        let notice = take_notice(&session).await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Image upload failed");
        assert!(take_notice(&session).await.is_none());
    }
}
