//! Errors returned by the authenticated request client.

use thiserror::Error;

use super::ErrorCategory;
use crate::traits::HttpError;

/// Outcome of a failed `AuthenticatedClient` call.
///
/// Only [`ApiError::AuthFailed`] implies the session was cleared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response was received from the server.
    #[error("Network error: {0}")]
    Network(String),

    /// The server rejected the access token and no refresh was possible for this call.
    #[error("Access token expired")]
    AuthExpired,

    /// Refreshing the credential pair failed; the session has been cleared.
    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },

    /// HTTP 403.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// HTTP 404.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// HTTP 422, with the server's explanation when it sent one.
    #[error("Validation failed: {}", message.as_deref().unwrap_or("no details"))]
    ValidationFailed { message: Option<String> },

    /// Any other 4xx/5xx status.
    #[error("Unexpected server error ({status}): {message}")]
    UnexpectedServerError { status: u16, message: String },

    /// A success response whose body could not be decoded.
    #[error("Invalid response body: {message}")]
    InvalidResponse { message: String },
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Network(_) => ErrorCategory::Network,
            ApiError::AuthExpired | ApiError::AuthFailed { .. } | ApiError::Forbidden { .. } => {
                ErrorCategory::Auth
            }
            ApiError::NotFound { .. } | ApiError::ValidationFailed { .. } => ErrorCategory::Client,
            ApiError::UnexpectedServerError { status, .. } if *status < 500 => {
                ErrorCategory::Client
            }
            ApiError::UnexpectedServerError { .. } => ErrorCategory::Server,
            ApiError::InvalidResponse { .. } => ErrorCategory::Protocol,
        }
    }

    /// Short error code for logs and telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "E_NET",
            ApiError::AuthExpired => "E_AUTH_EXPIRED",
            ApiError::AuthFailed { .. } => "E_AUTH_FAILED",
            ApiError::Forbidden { .. } => "E_FORBIDDEN",
            ApiError::NotFound { .. } => "E_NOT_FOUND",
            ApiError::ValidationFailed { .. } => "E_VALIDATION",
            ApiError::UnexpectedServerError { .. } => "E_SERVER",
            ApiError::InvalidResponse { .. } => "E_BAD_BODY",
        }
    }

    /// Whether the caller may reasonably retry the same call later.
    ///
    /// This layer never retries on its own beyond the single refresh-retry.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the caller should send the user back through login.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, ApiError::AuthExpired | ApiError::AuthFailed { .. })
    }

    /// HTTP status associated with this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthExpired => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::NotFound { .. } => Some(404),
            ApiError::ValidationFailed { .. } => Some(422),
            ApiError::UnexpectedServerError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        ApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse {
            message: err.to_string(),
        }
    }
}
