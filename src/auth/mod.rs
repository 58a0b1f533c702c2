//! Authenticated HTTP access.
//!
//! - [`SessionStore`] holds the current credential pair
//! - [`AuthenticatedClient`] dispatches requests with refresh-then-retry
//! - [`TokenRefresher`] exchanges a refresh token for a new pair

pub mod client;
pub mod refresh;
pub mod request;
pub mod session;

pub use client::{classify, AuthenticatedClient};
pub use refresh::{HttpTokenRefresher, RefreshError, TokenRefresher, TokenResponse};
pub use request::{ApiRequest, ApiResponse};
pub use session::{CredentialPair, SessionStore};
