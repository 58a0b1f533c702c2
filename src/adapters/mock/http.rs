//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that can return predefined
//! responses or errors, one-shot or sticky, and records every request.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::traits::{
    Headers, HttpClient, HttpError, HttpRequest, Method, RequestBody, Response, StreamingResponse,
};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: RequestBody,
}

impl RecordedRequest {
    /// Look up a header ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a buffered response (any status)
    Success(Response),
    /// Fail before any response is received
    Error(HttpError),
    /// Return a response whose body arrives as these chunks
    Stream { status: u16, chunks: Vec<Bytes> },
    /// Deliver these chunks, then fail the body stream
    StreamError { chunks: Vec<Bytes>, error: HttpError },
}

impl MockResponse {
    /// Shorthand for a buffered response with a string body.
    pub fn status(status: u16, body: &str) -> Self {
        MockResponse::Success(Response::new(status, Bytes::from(body.to_string())))
    }

    /// Shorthand for a 200 stream made of string chunks.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockResponse::Stream {
            status: 200,
            chunks: chunks.into_iter().map(|c| Bytes::from(c.into())).collect(),
        }
    }
}

/// Mock HTTP client for testing.
///
/// Lookup order for a URL: queued one-shot responses, then the sticky
/// response for the exact URL, then sticky prefix matches, then the default.
///
/// # Example
///
/// ```ignore
/// use portal_net::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.push_response("https://api.example.com/me", MockResponse::status(401, ""));
/// client.set_response("https://api.example.com/me", MockResponse::status(200, "{}"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// One-shot responses consumed in order
    queued: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Sticky responses by URL or URL prefix
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// Default response when nothing else matches
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a sticky response for a URL (exact match, or prefix of the request URL).
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), response);
    }

    /// Queue a one-shot response for an exact URL.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut queued = self.queued.lock().unwrap();
        queued.entry(url.to_string()).or_default().push_back(response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests whose URL starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<RecordedRequest> {
        self.get_requests()
            .into_iter()
            .filter(|r| r.url.starts_with(prefix))
            .collect()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record_request(&self, request: &HttpRequest) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: request.method,
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        });
    }

    fn get_response(&self, url: &str) -> Option<MockResponse> {
        {
            let mut queued = self.queued.lock().unwrap();
            if let Some(response) = queued.get_mut(url).and_then(|q| q.pop_front()) {
                return Some(response);
            }
        }

        let responses = self.responses.lock().unwrap();

        if let Some(response) = responses.get(url) {
            return Some(response.clone());
        }

        for (pattern, response) in responses.iter() {
            if url.starts_with(pattern) {
                return Some(response.clone());
            }
        }

        let default = self.default_response.lock().unwrap();
        default.clone()
    }
}

fn chunk_stream(
    chunks: Vec<Bytes>,
    error: Option<HttpError>,
) -> crate::traits::ByteStream {
    let items = chunks
        .into_iter()
        .map(Ok)
        .chain(error.into_iter().map(Err))
        .collect::<Vec<_>>();
    Box::pin(futures::stream::iter(items))
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<Response, HttpError> {
        self.record_request(&request);

        match self.get_response(&request.url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Stream { status, chunks }) => {
                Ok(Response::new(status, Bytes::from(chunks.concat())))
            }
            Some(MockResponse::StreamError { error, .. }) => Err(error),
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                request.url
            ))),
        }
    }

    async fn execute_stream(&self, request: HttpRequest) -> Result<StreamingResponse, HttpError> {
        self.record_request(&request);

        match self.get_response(&request.url) {
            Some(MockResponse::Stream { status, chunks }) => Ok(StreamingResponse {
                status,
                headers: Headers::new(),
                body: chunk_stream(chunks, None),
            }),
            Some(MockResponse::StreamError { chunks, error }) => Ok(StreamingResponse {
                status: 200,
                headers: Headers::new(),
                body: chunk_stream(chunks, Some(error)),
            }),
            Some(MockResponse::Success(response)) => Ok(StreamingResponse {
                status: response.status,
                headers: response.headers,
                body: chunk_stream(vec![response.body], None),
            }),
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                request.url
            ))),
        }
    }
}
