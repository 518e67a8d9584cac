//! Application state shared across handlers.

use std::sync::Arc;

use decor_api::{AdminApi, ApiError, RestClient};
use decor_core::{CurrencyCode, Price};
use rust_decimal::Decimal;

use crate::config::AdminConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    api: AdminApi,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built from the
    /// configured URL and API key.
    pub fn new(config: AdminConfig) -> Result<Self, ApiError> {
        let client = RestClient::new(&config.backend)?;
        let api = AdminApi::new(client);

        Ok(Self {
            inner: Arc::new(AppStateInner { config, api }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the admin backend API facade.
    #[must_use]
    pub fn api(&self) -> &AdminApi {
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
