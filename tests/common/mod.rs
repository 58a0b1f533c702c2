//! Common test utilities for integration tests.
//!
//! Fixtures for sessions, clients wired to a `wiremock::MockServer`, push
//! stream bodies and fast-reconnecting channel configs.
//!
//! # Example
//!
//! ```ignore
//! mod common;
//! use common::{api_client, test_store};
//!
//! let server = wiremock::MockServer::start().await;
//! let client = api_client(&server, test_store());
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;
use std::time::Duration;

use portal_net::adapters::ReqwestHttpClient;
use portal_net::auth::{AuthenticatedClient, CredentialPair, SessionStore};
use portal_net::config::ChannelConfig;
use portal_net::stream_client::StreamingRequestClient;
use wiremock::MockServer;

pub const OLD_ACCESS: &str = "test-access-token-12345";
pub const OLD_REFRESH: &str = "test-refresh-token-67890";
pub const NEW_ACCESS: &str = "new-access-token";
pub const NEW_REFRESH: &str = "new-refresh-token";

/// Credentials of a logged-in user.
pub fn test_credentials() -> CredentialPair {
    CredentialPair::new(OLD_ACCESS, OLD_REFRESH)
}

/// A store holding [`test_credentials`].
pub fn test_store() -> Arc<SessionStore> {
    Arc::new(SessionStore::with_credentials(test_credentials()))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Authenticated client talking to `server` through reqwest.
pub fn api_client(server: &MockServer, store: Arc<SessionStore>) -> AuthenticatedClient {
    AuthenticatedClient::new(Arc::new(ReqwestHttpClient::new()), store, server.uri())
}

pub fn stream_client(server: &MockServer, store: Arc<SessionStore>) -> StreamingRequestClient {
    StreamingRequestClient::new(api_client(server, store))
}

/// Body of a refresh response issuing [`NEW_ACCESS`] / [`NEW_REFRESH`].
pub fn refreshed_tokens() -> serde_json::Value {
    serde_json::json!({
        "access_token": NEW_ACCESS,
        "refresh_token": NEW_REFRESH,
        "token_type": "Bearer"
    })
}

/// Encode JSON payloads as push stream frames.
pub fn sse_body(frames: &[serde_json::Value]) -> String {
    frames
        .iter()
        .map(|frame| format!("data: {}\n\n", frame))
        .collect()
}

/// Channel config with millisecond reconnect delays.
pub fn fast_channel_config(max_attempts: u32) -> ChannelConfig {
    ChannelConfig::new("ws://mock/ws")
        .with_max_attempts(max_attempts)
        .with_reconnect_interval(Duration::from_millis(20))
}
