//! Error category classification.
//!
//! Categories give callers one coarse switch to decide between retrying,
//! sending the user back to login, or reporting a bug.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No response was received (connection refused, DNS, timeout, socket drop).
    Network,

    /// Credentials are missing, expired or rejected.
    Auth,

    /// The backend answered with a status this layer cannot recover from.
    Server,

    /// The request itself was rejected (validation, missing resource).
    Client,

    /// The peer sent bytes that do not follow the wire format.
    Protocol,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::Protocol => "protocol",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_categories() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Server.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::Client.is_retryable());
        assert!(!ErrorCategory::Protocol.is_retryable());
    }

    #[test]
    fn test_display_matches_as_str() {
        for category in [
            ErrorCategory::Network,
            ErrorCategory::Auth,
            ErrorCategory::Server,
            ErrorCategory::Client,
            ErrorCategory::Protocol,
        ] {
            assert_eq!(category.to_string(), category.as_str());
        }
    }
}
