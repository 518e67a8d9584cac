//! Per-visitor backend session.
//!
//! The backend authenticates customers and admins with its own session cookie.
//! That cookie is captured from the login response, stored in the visitor's
//! server-side session, and replayed as a `Cookie` header on that visitor's
//! requests. Nothing is shared between visitors.

use std::fmt;

use decor_core::model::User;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};

/// The backend's session cookie(s) for one visitor, as a `Cookie` header value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendSession(String);

impl BackendSession {
    /// Wrap an existing `Cookie` header value.
    #[must_use]
    pub fn new(cookie_header: impl Into<String>) -> Self {
        Self(cookie_header.into())
    }

    /// Collect `name=value` pairs from every `Set-Cookie` header.
    ///
    /// Attributes (`Path`, `HttpOnly`, ...) are dropped. Cookies cleared by
    /// the backend (empty value) are skipped. Returns `None` when nothing
    /// usable was set.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let pairs: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| {
                pair.split_once('=')
                    .is_some_and(|(name, value)| !name.trim().is_empty() && !value.is_empty())
            })
            .collect();

        (!pairs.is_empty()).then(|| Self(pairs.join("; ")))
    }

    /// Value for the outgoing `Cookie` header.
    #[must_use]
    pub fn cookie_header(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BackendSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackendSession([REDACTED])")
    }
}

/// A freshly logged-in backend user and the cookie that authenticates them.
#[derive(Debug, Clone)]
pub struct Login {
    pub user: User,
    pub session: BackendSession,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_from_headers_keeps_name_value_pairs() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("token=abc123; Path=/; HttpOnly; SameSite=Lax"),
        );
        headers.append(SET_COOKIE, HeaderValue::from_static("refresh=xyz; Path=/auth"));

        let session = BackendSession::from_headers(&headers).unwrap();
        assert_eq!(session.cookie_header(), "token=abc123; refresh=xyz");
    }

    #[test]
    fn test_from_headers_skips_cleared_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("token=; Max-Age=0"));
        assert!(BackendSession::from_headers(&headers).is_none());
        assert!(BackendSession::from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let session = BackendSession::new("token=secret");
        assert!(!format!("{session:?}").contains("secret"));
    }
}
