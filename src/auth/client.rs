//! Authenticated request client.
//!
//! Attaches the bearer token from the [`SessionStore`], classifies response
//! statuses into [`ApiError`], and on a 401 refreshes the credentials once and
//! re-dispatches the same request once.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::refresh::{refresh_single_flight, HttpTokenRefresher, TokenRefresher};
use super::request::{ApiRequest, ApiResponse};
use super::session::SessionStore;
use crate::config::{join_url, ClientConfig, DEFAULT_REFRESH_PATH};
use crate::error::ApiError;
use crate::traits::{HttpClient, HttpRequest, Response, StreamingResponse};

const ACCEPT_JSON: &str = "application/json";

/// Result of one dispatch: the success value, or a buffered non-2xx response.
enum Reply<T> {
    Success(T),
    Failure(Response),
}

/// HTTP client that owns the refresh-then-retry protocol.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use portal_net::adapters::ReqwestHttpClient;
/// use portal_net::auth::{AuthenticatedClient, CredentialPair, SessionStore};
///
/// let store = Arc::new(SessionStore::with_credentials(CredentialPair::new(access, refresh)));
/// let client = AuthenticatedClient::new(Arc::new(ReqwestHttpClient::new()), store, "https://api.example.com");
/// let companies: serde_json::Value = client.get("/companies").await?;
/// ```
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: Arc<dyn HttpClient>,
    store: Arc<SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    base_url: String,
}

impl AuthenticatedClient {
    /// Client that refreshes via `POST {base_url}/auth/refresh` on the same transport.
    pub fn new(
        http: Arc<dyn HttpClient>,
        store: Arc<SessionStore>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        let refresher = Arc::new(HttpTokenRefresher::new(
            Arc::clone(&http),
            &base_url,
            DEFAULT_REFRESH_PATH,
        ));
        Self {
            http,
            store,
            refresher,
            base_url,
        }
    }

    pub fn from_config(
        http: Arc<dyn HttpClient>,
        store: Arc<SessionStore>,
        config: &ClientConfig,
    ) -> Self {
        let refresher = Arc::new(HttpTokenRefresher::new(
            Arc::clone(&http),
            &config.api_base_url,
            &config.refresh_path,
        ));
        Self {
            http,
            store,
            refresher,
            base_url: config.api_base_url.clone(),
        }
    }

    /// Replace the refresh strategy.
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dispatch `request` and return the 2xx response.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let http = &self.http;
        self.dispatch(&request, ACCEPT_JSON, |req| async move {
            let response = http.execute(req).await?;
            if response.is_success() {
                Ok::<_, ApiError>(Reply::Success(ApiResponse {
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                }))
            } else {
                Ok(Reply::Failure(response))
            }
        })
        .await
    }

    /// Dispatch `request` and decode the body as `T`.
    pub async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.request(request).await?.json()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request_json(ApiRequest::post(path).with_json(body)?)
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request_json(ApiRequest::put(path).with_json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request_json(ApiRequest::patch(path).with_json(body)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(ApiRequest::delete(path)).await
    }

    /// Dispatch `request` and hand back the unread body of the 2xx response.
    pub(crate) async fn open_stream(
        &self,
        request: &ApiRequest,
        accept: &str,
    ) -> Result<StreamingResponse, ApiError> {
        let http = &self.http;
        self.dispatch(request, accept, |req| async move {
            let response = http.execute_stream(req).await?;
            if response.is_success() {
                Ok::<_, ApiError>(Reply::Success(response))
            } else {
                Ok(Reply::Failure(response.into_response().await?))
            }
        })
        .await
    }

    /// Send once; on a 401 for an authenticated call, refresh and send once more.
    async fn dispatch<T, F, Fut>(
        &self,
        request: &ApiRequest,
        accept: &str,
        send: F,
    ) -> Result<T, ApiError>
    where
        F: Fn(HttpRequest) -> Fut,
        Fut: Future<Output = Result<Reply<T>, ApiError>>,
    {
        let sent_token = if request.requires_auth {
            self.store.access_token()
        } else {
            None
        };

        debug!("{} {}", request.method, request.path);
        let failure = match send(self.build(request, accept, sent_token.as_deref())).await? {
            Reply::Success(value) => return Ok(value),
            Reply::Failure(response) => response,
        };

        if failure.status != 401 || sent_token.is_none() {
            return Err(classify(&failure));
        }

        let pair = refresh_single_flight(
            self.store.as_ref(),
            self.refresher.as_ref(),
            sent_token.as_deref(),
        )
        .await?;

        debug!("Retrying {} {} with refreshed credentials", request.method, request.path);
        match send(self.build(request, accept, Some(&pair.access_token))).await? {
            Reply::Success(value) => Ok(value),
            Reply::Failure(response) => {
                if response.status == 401 {
                    warn!("Refreshed token rejected for {} {}", request.method, request.path);
                }
                Err(classify(&response))
            }
        }
    }

    fn build(&self, request: &ApiRequest, accept: &str, token: Option<&str>) -> HttpRequest {
        let url = join_url(&self.base_url, &request.path_and_query());
        let mut http_request = HttpRequest::new(request.method, url)
            .with_header("Accept", accept)
            .with_body(request.body.clone());
        if let Some(token) = token {
            http_request = http_request.with_header("Authorization", format!("Bearer {}", token));
        }
        http_request
    }
}

/// Map a non-2xx response to an [`ApiError`].
pub fn classify(response: &Response) -> ApiError {
    let message = error_message(response);
    match response.status {
        401 => ApiError::AuthExpired,
        403 => ApiError::Forbidden {
            message: message.unwrap_or_else(|| "Forbidden".to_string()),
        },
        404 => ApiError::NotFound {
            message: message.unwrap_or_else(|| "Not found".to_string()),
        },
        422 => ApiError::ValidationFailed { message },
        status => ApiError::UnexpectedServerError {
            status,
            message: message.unwrap_or_else(|| format!("HTTP {}", status)),
        },
    }
}

/// Server-supplied explanation from an error body.
///
/// Looks at `detail` (string, or list of `{msg}` objects), then `message`,
/// then `error`. Non-JSON bodies are returned as trimmed text.
fn error_message(response: &Response) -> Option<String> {
    let text = response.text().ok()?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<Value>(text) else {
        return Some(text.to_string());
    };

    match json.get("detail") {
        Some(Value::String(detail)) => return Some(detail.clone()),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    ["message", "error"]
        .iter()
        .find_map(|key| json.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use crate::auth::CredentialPair;
    use crate::traits::{HttpError, Method, RequestBody};
    use bytes::Bytes;

    const BASE: &str = "https://api.example.com";
    const ME: &str = "https://api.example.com/me";
    const REFRESH: &str = "https://api.example.com/auth/refresh";

    fn client_with(http: &MockHttpClient, pair: Option<CredentialPair>) -> AuthenticatedClient {
        let store = match pair {
            Some(pair) => SessionStore::with_credentials(pair),
            None => SessionStore::new(),
        };
        AuthenticatedClient::new(Arc::new(http.clone()), Arc::new(store), BASE)
    }

    fn response(status: u16, body: &str) -> Response {
        Response::new(status, Bytes::from(body.to_string()))
    }

    #[tokio::test]
    async fn test_attaches_bearer_and_accept() {
        let http = MockHttpClient::new();
        http.set_response(ME, MockResponse::status(200, r#"{"id":1}"#));
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let value: Value = client.get("/me").await.unwrap();
        assert_eq!(value["id"], 1);

        let requests = http.get_requests();
        assert_eq!(requests[0].header("Authorization"), Some("Bearer a1"));
        assert_eq!(requests[0].header("Accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_no_header_without_session_or_for_public_calls() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::status(200, "{}"));

        let anonymous = client_with(&http, None);
        anonymous.request(ApiRequest::get("/me")).await.unwrap();

        let public = client_with(&http, Some(CredentialPair::new("a1", "r1")));
        public
            .request(ApiRequest::get("/health").without_auth())
            .await
            .unwrap();

        for request in http.get_requests() {
            assert_eq!(request.header("Authorization"), None);
        }
    }

    #[tokio::test]
    async fn test_401_refreshes_and_retries_once() {
        let http = MockHttpClient::new();
        http.push_response(ME, MockResponse::status(401, ""));
        http.push_response(ME, MockResponse::status(200, r#"{"id":1}"#));
        http.set_response(
            REFRESH,
            MockResponse::status(200, r#"{"access_token":"a2","refresh_token":"r2"}"#),
        );
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let value: Value = client.get("/me").await.unwrap();
        assert_eq!(value["id"], 1);

        let attempts = http.requests_to(ME);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].header("Authorization"), Some("Bearer a1"));
        assert_eq!(attempts[1].header("Authorization"), Some("Bearer a2"));
        assert_eq!(http.requests_to(REFRESH).len(), 1);
        assert_eq!(client.store().get(), Some(CredentialPair::new("a2", "r2")));
    }

    #[tokio::test]
    async fn test_retry_keeps_method_and_body() {
        let http = MockHttpClient::new();
        let url = "https://api.example.com/companies";
        http.push_response(url, MockResponse::status(401, ""));
        http.push_response(url, MockResponse::status(201, r#"{"id":7}"#));
        http.set_response(REFRESH, MockResponse::status(200, r#"{"access_token":"a2"}"#));
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let created: Value = client
            .post("/companies", &serde_json::json!({"name": "Acme"}))
            .await
            .unwrap();
        assert_eq!(created["id"], 7);

        let attempts = http.requests_to(url);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].method, Method::Post);
        assert_eq!(attempts[0].body, attempts[1].body);
        assert_eq!(
            attempts[1].body,
            RequestBody::Json(serde_json::json!({"name": "Acme"}))
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_session() {
        let http = MockHttpClient::new();
        http.set_response(ME, MockResponse::status(401, ""));
        http.set_response(REFRESH, MockResponse::status(401, "revoked"));
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let err = client.request(ApiRequest::get("/me")).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthFailed { .. }));
        assert!(err.requires_reauth());
        assert!(client.store().get().is_none());
        assert_eq!(http.requests_to(ME).len(), 1);
    }

    #[tokio::test]
    async fn test_second_401_is_auth_expired() {
        let http = MockHttpClient::new();
        http.set_response(ME, MockResponse::status(401, ""));
        http.set_response(REFRESH, MockResponse::status(200, r#"{"access_token":"a2"}"#));
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let err = client.request(ApiRequest::get("/me")).await.unwrap_err();
        assert_eq!(err, ApiError::AuthExpired);
        assert_eq!(http.requests_to(ME).len(), 2);
        assert_eq!(http.requests_to(REFRESH).len(), 1);
        // Credentials are kept
        assert_eq!(client.store().access_token().as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn test_401_on_public_request_does_not_refresh() {
        let http = MockHttpClient::new();
        http.set_response(ME, MockResponse::status(401, ""));
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let err = client
            .request(ApiRequest::get("/me").without_auth())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::AuthExpired);
        assert!(http.requests_to(REFRESH).is_empty());
        assert!(client.store().is_authenticated());
    }

    #[tokio::test]
    async fn test_network_error_is_not_retried() {
        let http = MockHttpClient::new();
        http.set_response(
            ME,
            MockResponse::Error(HttpError::ConnectionFailed("refused".to_string())),
        );
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let err = client.request(ApiRequest::get("/me")).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(http.get_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_success_body_decodes() {
        let http = MockHttpClient::new();
        http.set_response(
            "https://api.example.com/companies/1",
            MockResponse::status(204, ""),
        );
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let value: Value = client.delete("/companies/1").await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_invalid_response() {
        let http = MockHttpClient::new();
        http.set_response(ME, MockResponse::status(200, "<html>oops</html>"));
        let client = client_with(&http, Some(CredentialPair::new("a1", "r1")));

        let err = client.get::<Value>("/me").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse { .. }));
    }

    #[test]
    fn test_classify_statuses() {
        assert_eq!(classify(&response(401, "")), ApiError::AuthExpired);
        assert_eq!(
            classify(&response(403, r#"{"detail":"Not your company"}"#)),
            ApiError::Forbidden {
                message: "Not your company".to_string()
            }
        );
        assert_eq!(
            classify(&response(404, "")),
            ApiError::NotFound {
                message: "Not found".to_string()
            }
        );
        assert_eq!(
            classify(&response(500, "boom")),
            ApiError::UnexpectedServerError {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert_eq!(
            classify(&response(409, "")),
            ApiError::UnexpectedServerError {
                status: 409,
                message: "HTTP 409".to_string()
            }
        );
    }

    #[test]
    fn test_validation_messages() {
        let list = r#"{"detail":[{"loc":["body","name"],"msg":"field required"},{"msg":"ticker too long"}]}"#;
        assert_eq!(
            classify(&response(422, list)),
            ApiError::ValidationFailed {
                message: Some("field required; ticker too long".to_string())
            }
        );
        assert_eq!(
            classify(&response(422, r#"{"message":"bad quarter"}"#)),
            ApiError::ValidationFailed {
                message: Some("bad quarter".to_string())
            }
        );
        assert_eq!(
            classify(&response(422, r#"{"error":"bad year"}"#)),
            ApiError::ValidationFailed {
                message: Some("bad year".to_string())
            }
        );
        assert_eq!(
            classify(&response(422, "{}")),
            ApiError::ValidationFailed { message: None }
        );
    }
}
