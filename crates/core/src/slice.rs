//! Request-state containers and flash notices.
//!
//! A [`Slice`] holds what a page knows about one kind of entity: the records
//! fetched so far and the outcome of the last request that fetched them.
//! Handlers resolve one async call into a slice and the template renders the
//! records, a spinner-free empty state, or the error message.

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};

/// Lifecycle of the last request made for a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Records of one entity kind plus request flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice<T> {
    pub items: Vec<T>,
    pub status: LoadStatus,
    pub message: Option<String>,
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: LoadStatus::Idle,
            message: None,
        }
    }
}

impl<T> Slice<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A request has started. Existing items are kept.
    pub fn pending(&mut self) {
        self.status = LoadStatus::Loading;
        self.message = None;
    }

    /// The request succeeded with `items`.
    pub fn fulfilled(&mut self, items: Vec<T>) {
        self.items = items;
        self.status = LoadStatus::Succeeded;
        self.message = None;
    }

    /// The request failed. Existing items are kept so a stale list can still
    /// be shown next to the error.
    pub fn rejected(&mut self, message: impl Into<String>) {
        self.status = LoadStatus::Failed;
        self.message = Some(message.into());
    }

    /// Clear flags and message, keeping items.
    pub fn reset(&mut self) {
        self.status = LoadStatus::Idle;
        self.message = None;
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == LoadStatus::Failed
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == LoadStatus::Succeeded
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Error message for templates; empty unless the slice failed.
    #[must_use]
    pub fn error_message(&self) -> &str {
        if self.is_error() {
            self.message.as_deref().unwrap_or("Something went wrong")
        } else {
            ""
        }
    }

    /// Run `request` and record its outcome.
    pub async fn resolve<F, E>(&mut self, request: F)
    where
        F: Future<Output = Result<Vec<T>, E>>,
        E: Display,
    {
        self.pending();
        match request.await {
            Ok(items) => self.fulfilled(items),
            Err(e) => self.rejected(e.to_string()),
        }
    }

    /// Convenience for handlers: a slice already resolved from `request`.
    pub async fn load<F, E>(request: F) -> Self
    where
        F: Future<Output = Result<Vec<T>, E>>,
        E: Display,
    {
        let mut slice = Self::new();
        slice.resolve(request).await;
        slice
    }

    /// Build a slice from a finished result.
    pub fn from_result<E: Display>(result: Result<Vec<T>, E>) -> Self {
        let mut slice = Self::new();
        match result {
            Ok(items) => slice.fulfilled(items),
            Err(e) => slice.rejected(e.to_string()),
        }
        slice
    }

    /// Map the records, keeping flags.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            items: self.items.into_iter().map(f).collect(),
            status: self.status,
            message: self.message,
        }
    }
}

/// Severity of a flash notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// CSS modifier class for the toast.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.level {
            NoticeLevel::Success => "notice--success",
            NoticeLevel::Error => "notice--error",
            NoticeLevel::Info => "notice--info",
        }
    }
}
