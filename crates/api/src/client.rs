//! Shared REST transport for the shop backend.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, warn};
use url::Url;

use crate::envelope;
use crate::error::ApiError;
use crate::session::BackendSession;

/// Header carrying the backend API key on every request.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Connection settings for the backend.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Value of the `x-api-key` header.
    pub api_key: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// REST client for the shop backend.
///
/// Cheap to clone. A clone made with [`RestClient::with_session`] forwards one
/// visitor's backend cookie; the base client sends none.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
    session: Option<BackendSession>,
}

struct RestClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Create a client from backend settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or API key is malformed, or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Parse(format!(
                "backend URL cannot be a base: {}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| ApiError::Parse(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(RestClientInner { client, base_url }),
            session: None,
        })
    }

    /// A clone that forwards `session` as the `Cookie` header.
    #[must_use]
    pub fn with_session(&self, session: BackendSession) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            session: Some(session),
        }
    }

    /// The forwarded session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&BackendSession> {
        self.session.as_ref()
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build an endpoint URL from path segments. Each segment is percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot take path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Parse("backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build an endpoint URL with query parameters. Empty values are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot take path segments.
    pub fn endpoint_with_query(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Url, ApiError> {
        let mut url = self.endpoint(segments)?;
        let pairs: Vec<_> = query.iter().filter(|(_, v)| !v.is_empty()).collect();
        if !pairs.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// GET and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let request = self.inner.client.get(url);
        self.execute(request).await
    }

    /// POST a JSON body and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post<T, B>(&self, url: Url, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.inner.client.post(url).json(body);
        self.execute(request).await
    }

    /// PUT a JSON body and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn put<T, B>(&self, url: Url, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.inner.client.put(url).json(body);
        self.execute(request).await
    }

    /// DELETE and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let request = self.inner.client.delete(url);
        self.execute(request).await
    }

    /// POST a JSON body, ignoring any payload in the response.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post_ack<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<(), ApiError> {
        self.post::<IgnoredAny, B>(url, body).await.map(drop)
    }

    /// PUT a JSON body, ignoring any payload in the response.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn put_ack<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<(), ApiError> {
        self.put::<IgnoredAny, B>(url, body).await.map(drop)
    }

    /// DELETE, ignoring any payload in the response.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn delete_ack(&self, url: Url) -> Result<(), ApiError> {
        self.delete::<IgnoredAny>(url).await.map(drop)
    }

    /// POST a multipart form and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        url: Url,
        form: Form,
    ) -> Result<T, ApiError> {
        let request = self.inner.client.post(url).multipart(form);
        self.execute(request).await
    }

    /// POST a JSON body and also return the backend session the response set.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post_for_session<T, B>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<(T, Option<BackendSession>), ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.inner.client.post(url).json(body);
        let response = self.send(request).await?;
        let session = BackendSession::from_headers(response.headers());
        let value = Self::handle_response(response).await?;
        Ok((value, session))
    }

    /// Whether the backend answers at all. Used by readiness probes.
    pub async fn is_reachable(&self) -> bool {
        let Ok(url) = self.endpoint(&["api", "shipping"]) else {
            return false;
        };
        match self.inner.client.get(url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                warn!(error = %e, "Backend unreachable");
                false
            }
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        Self::handle_response(response).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let request = match &self.session {
            Some(session) => match HeaderValue::from_str(session.cookie_header()) {
                Ok(mut cookie) => {
                    cookie.set_sensitive(true);
                    request.header(COOKIE, cookie)
                }
                Err(_) => {
                    warn!("Dropping malformed backend session cookie");
                    request
                }
            },
            None => request,
        };

        let response = request.send().await?;
        debug!(
            status = %response.status(),
            url = %response.url().path(),
            "Backend response"
        );
        Ok(response)
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return envelope::decode(&body);
        }

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned a server error"
            );
        }

        Err(ApiError::from_status(
            status.as_u16(),
            envelope::error_message(&body),
        ))
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("has_session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> RestClient {
        RestClient::new(&BackendConfig {
            base_url: base.to_string(),
            api_key: SecretString::from("test-key"),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let c = client("http://localhost:5000/");
        let url = c.endpoint(&["api", "product", "slug", "oak chair/1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/product/slug/oak%20chair%2F1");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let c = client("http://localhost:5000/shop");
        let url = c.endpoint(&["api", "category"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/shop/api/category");
    }

    #[test]
    fn test_endpoint_with_query_skips_empty_values() {
        let c = client("http://localhost:5000");
        let url = c
            .endpoint_with_query(
                &["api", "product"],
                &[("search", "oak lamp".to_string()), ("category", String::new())],
            )
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/product?search=oak+lamp");
    }

    #[test]
    fn test_with_session_shares_transport() {
        let base = client("http://localhost:5000");
        let scoped = base.with_session(BackendSession::new("token=abc"));
        assert!(base.session().is_none());
        assert_eq!(scoped.session().unwrap().cookie_header(), "token=abc");
        assert!(Arc::ptr_eq(&base.inner, &scoped.inner));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = BackendConfig {
            base_url: "http://localhost:5000".to_string(),
            api_key: SecretString::from("super-secret"),
            timeout: Duration::from_secs(5),
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_not_ready() {
        // Nothing listens on the discard port
        let c = client("http://127.0.0.1:9");
        assert!(!c.is_reachable().await);
    }

    #[test]
    fn test_rejects_non_base_url() {
        let result = RestClient::new(&BackendConfig {
            base_url: "mailto:shop@example.com".to_string(),
            api_key: SecretString::from("k"),
            timeout: Duration::from_secs(5),
        });
        assert!(result.is_err());
    }
}
