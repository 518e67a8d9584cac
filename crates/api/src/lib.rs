//! Decor API - REST client for the shop backend.
//!
//! # Architecture
//!
//! - [`RestClient`] is the shared transport: base URL, `x-api-key` header,
//!   timeout, envelope decoding and error mapping. No retries.
//! - [`StorefrontApi`] and [`AdminApi`] are per-surface facades over it.
//! - A visitor's backend session cookie lives in their server-side session
//!   and is forwarded per request via [`RestClient::with_session`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use decor_api::{BackendConfig, RestClient, StorefrontApi};
//! use secrecy::SecretString;
//!
//! # async fn run() -> Result<(), decor_api::ApiError> {
//! let client = RestClient::new(&BackendConfig {
//!     base_url: "http://localhost:5000".to_string(),
//!     api_key: SecretString::from("key"),
//!     timeout: Duration::from_secs(15),
//! })?;
//! let api = StorefrontApi::new(client);
//!
//! let categories = api.categories().await?;
//! let login = api.login("ada@example.com", "correct horse").await?;
//! let cart = api.cart(&login.session).await?;
//! # let _ = (categories, cart);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod client;
pub mod envelope;
pub mod error;
pub mod requests;
pub mod session;
pub mod storefront;

pub use admin::{AdminApi, ImageFile};
pub use client::{API_KEY_HEADER, BackendConfig, RestClient};
pub use error::ApiError;
pub use session::{BackendSession, Login};
pub use storefront::StorefrontApi;
