//! Backend API errors.

use thiserror::Error;

/// Errors that can occur when calling the shop backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a failure status or `success: false`.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// The backend session is missing or expired.
    #[error("Unauthorized")]
    Unauthorized,

    /// The backend answered 2xx with `success: false`.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The session is valid but lacks the required role.
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A success envelope without the expected payload.
    #[error("Response is missing its data")]
    MissingData,

    /// The backend base URL or a path could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Map a failure status and the backend's message to an error.
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound(message.unwrap_or_else(|| "Resource not found".to_string())),
            _ => Self::Status {
                status,
                message: message.unwrap_or_else(|| "Unknown error".to_string()),
            },
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Client-side (4xx) failure the user can act on.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 400 && *status < 500,
            Self::Rejected(_) | Self::Unauthorized | Self::Forbidden | Self::NotFound(_) => true,
            _ => false,
        }
    }

    /// Message safe to show in a notice.
    ///
    /// Backend validation messages (4xx or `success: false`) are passed
    /// through; anything else gets a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { status, message } if (400..500).contains(status) => message.clone(),
            Self::Rejected(message) => message.clone(),
            Self::Unauthorized => "Please sign in to continue.".to_string(),
            Self::Forbidden => "You do not have access to that.".to_string(),
            Self::NotFound(_) => "That item could not be found.".to_string(),
            _ => "The shop is temporarily unavailable. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(ApiError::from_status(401, None).is_unauthorized());
        assert!(matches!(ApiError::from_status(403, None), ApiError::Forbidden));
        assert!(ApiError::from_status(404, Some("Product not found".into())).is_not_found());
        assert!(matches!(
            ApiError::from_status(422, Some("Out of stock".into())),
            ApiError::Status { status: 422, ref message } if message == "Out of stock"
        ));
    }

    #[test]
    fn test_user_message_hides_server_errors() {
        let err = ApiError::from_status(400, Some("Coupon expired".into()));
        assert_eq!(err.user_message(), "Coupon expired");
        assert!(err.is_client_error());

        let err = ApiError::from_status(500, Some("db connection refused".into()));
        assert!(!err.user_message().contains("db"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_rejection_is_a_client_error() {
        let err = ApiError::Rejected("Out of stock".into());
        assert!(err.is_client_error());
        assert_eq!(err.user_message(), "Out of stock");
    }
}
