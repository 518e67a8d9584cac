//! Application state shared across handlers.

use std::sync::Arc;

use decor_api::{ApiError, RestClient, StorefrontApi};
use decor_core::{CurrencyCode, Price};
use rust_decimal::Decimal;

use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: StorefrontApi,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built from the
    /// configured URL and API key.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let client = RestClient::new(&config.backend)?;
        let api = StorefrontApi::new(client);

        Ok(Self {
            inner: Arc::new(AppStateInner { config, api }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API facade.
    #[must_use]
    pub fn api(&self) -> &StorefrontApi {
        &self.inner.api
    }

    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.config.currency
    }

    /// Format an amount in the store currency.
    #[must_use]
    pub fn money(&self, amount: Decimal) -> String {
        Price::new(amount, self.currency()).display()
    }
}
