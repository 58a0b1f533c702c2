//! Token refresh.
//!
//! [`TokenRefresher`] exchanges a refresh token for a new pair.
//! [`refresh_single_flight`] wraps it with the store's refresh gate so that
//! concurrent 401s cost one refresh call.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::session::{CredentialPair, SessionStore};
use crate::config::join_url;
use crate::error::ApiError;
use crate::traits::{HttpClient, HttpError, HttpRequest, Method, RequestBody};

/// Why a refresh did not produce a new pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Refresh request failed: {0}")]
    Network(#[from] HttpError),

    #[error("Refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),
}

/// Body of a successful refresh response.
///
/// Both snake_case and camelCase field names are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Build the replacement pair, keeping the old refresh token if none was issued.
    pub fn into_pair(self, previous_refresh: &str) -> CredentialPair {
        CredentialPair {
            access_token: self.access_token,
            refresh_token: Some(
                self.refresh_token
                    .unwrap_or_else(|| previous_refresh.to_string()),
            ),
        }
    }
}

/// Exchanges a refresh token for a new credential pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, RefreshError>;
}

/// Refresher that calls `POST {base}{refresh_path}` with `{"refresh_token": ...}`.
pub struct HttpTokenRefresher {
    http: Arc<dyn HttpClient>,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str, refresh_path: &str) -> Self {
        Self {
            http,
            url: join_url(base_url, refresh_path),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, RefreshError> {
        let body = serde_json::json!({
            "refresh_token": refresh_token,
        });

        let request = HttpRequest::new(Method::Post, &self.url)
            .with_header("Accept", "application/json")
            .with_body(RequestBody::Json(body));

        let response = self.http.execute(request).await?;

        if !response.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RefreshError::Rejected {
                status: response.status,
                message,
            });
        }

        let data: TokenResponse = response
            .json()
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        Ok(data.into_pair(refresh_token))
    }
}

/// Obtain a pair newer than `rejected_token`, refreshing at most once per store.
///
/// Callers that were waiting on the gate while another caller refreshed pick up
/// the result instead of refreshing again. A failed refresh clears the store,
/// which every waiter then sees as [`ApiError::AuthFailed`].
pub(crate) async fn refresh_single_flight(
    store: &SessionStore,
    refresher: &dyn TokenRefresher,
    rejected_token: Option<&str>,
) -> Result<CredentialPair, ApiError> {
    let _gate = store.lock_refresh().await;

    let current = store.get().ok_or_else(|| ApiError::AuthFailed {
        reason: "Session is no longer available".to_string(),
    })?;

    if rejected_token != Some(current.access_token.as_str()) {
        debug!("Credentials already refreshed by another request");
        return Ok(current);
    }

    let Some(refresh_token) = current.refresh_token.as_deref() else {
        warn!("Access token rejected and no refresh token available");
        store.clear();
        return Err(ApiError::AuthFailed {
            reason: RefreshError::NoRefreshToken.to_string(),
        });
    };

    info!("Access token rejected, refreshing credentials");
    match refresher.refresh(refresh_token).await {
        Ok(pair) => {
            store.replace(pair.clone());
            info!("Credentials refreshed");
            Ok(pair)
        }
        Err(e) => {
            warn!("Token refresh failed: {}", e);
            store.clear();
            Err(ApiError::AuthFailed {
                reason: e.to_string(),
            })
        }
    }
}
