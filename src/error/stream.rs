//! Streaming-related error types.

use thiserror::Error;

use super::{ApiError, ErrorCategory};

/// Errors and warnings raised while consuming a push stream.
///
/// Not every variant ends the stream: see [`StreamError::is_terminal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The request that opens the stream failed.
    #[error(transparent)]
    Http(#[from] ApiError),

    /// One frame could not be understood. It is skipped.
    #[error("Malformed stream frame: {reason}")]
    MalformedFrame { reason: String },

    /// The server sent an explicit `error` frame.
    #[error("Stream error from server: {message}")]
    Server { message: String },

    /// Reading the response body failed mid-stream.
    #[error("Stream transport failed: {message}")]
    Transport { message: String },

    /// The stream closed without ever sending a `start` frame.
    #[error("Stream closed without a start frame")]
    NeverStarted,

    /// The stream closed without an `end` or `error` frame.
    #[error("Stream closed before an end frame")]
    ClosedBeforeEnd,
}

impl StreamError {
    /// Whether the stream is over after this error.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamError::Http(_) | StreamError::Server { .. } | StreamError::Transport { .. }
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Http(err) => err.category(),
            StreamError::Server { .. } => ErrorCategory::Server,
            StreamError::Transport { .. } => ErrorCategory::Network,
            StreamError::MalformedFrame { .. }
            | StreamError::NeverStarted
            | StreamError::ClosedBeforeEnd => ErrorCategory::Protocol,
        }
    }
}
