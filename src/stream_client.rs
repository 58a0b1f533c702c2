//! Streaming request client.
//!
//! Opens a push stream through [`AuthenticatedClient`] (same refresh-then-retry
//! protocol) and decodes the response body into [`StreamEvent`]s as it arrives.

use futures::stream::{self, Stream};
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::{debug, warn};

use crate::auth::{ApiRequest, AuthenticatedClient};
use crate::error::{ApiError, StreamError};
use crate::sse::{StreamDecoder, StreamEvent};
use crate::traits::ByteStream;

const ACCEPT_EVENT_STREAM: &str = "text/event-stream";

/// Decoded events of one push stream, in byte order.
///
/// Ends after an `End` or `Error` event, after a transport failure, or when the
/// server closes the body. Dropping it stops reading.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, StreamError>> + Send>>;

/// Client for chat-style streaming endpoints.
#[derive(Clone)]
pub struct StreamingRequestClient {
    client: AuthenticatedClient,
}

impl StreamingRequestClient {
    pub fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Open the stream. Fails like [`AuthenticatedClient::request`] when the
    /// response is not 2xx.
    pub async fn send(&self, request: ApiRequest) -> Result<EventStream, ApiError> {
        let response = self.client.open_stream(&request, ACCEPT_EVENT_STREAM).await?;
        debug!("Stream opened for {} {}", request.method, request.path);
        Ok(decode_events(response.body))
    }

    /// Drain the stream and return the final answer text.
    pub async fn collect_response(&self, request: ApiRequest) -> Result<String, StreamError> {
        let mut events = self.send(request).await?;

        while let Some(item) = events.next().await {
            match item {
                Ok(StreamEvent::End { text }) => return Ok(text),
                Ok(StreamEvent::Error { message }) => return Err(StreamError::Server { message }),
                Ok(_) => {}
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => debug!("Stream warning: {}", e),
            }
        }

        Err(StreamError::ClosedBeforeEnd)
    }
}

struct DecodeState {
    body: ByteStream,
    decoder: Option<StreamDecoder>,
    queue: VecDeque<Result<StreamEvent, StreamError>>,
}

impl DecodeState {
    /// Decoder gone: nothing more will be read.
    fn is_done(&self) -> bool {
        self.decoder.is_none()
    }
}

/// Decode a response body into an [`EventStream`].
pub fn decode_events(body: ByteStream) -> EventStream {
    let state = DecodeState {
        body,
        decoder: Some(StreamDecoder::new()),
        queue: VecDeque::new(),
    };

    let events = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some((item, state));
            }
            let decoder = state.decoder.as_mut()?;

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for event in decoder.feed(&chunk) {
                        let terminal = event.is_terminal();
                        state.queue.push_back(Ok(event));
                        if terminal {
                            state.decoder = None;
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("Stream read failed: {}", e);
                    state.queue.push_back(Err(StreamError::Transport {
                        message: e.to_string(),
                    }));
                    state.decoder = None;
                }
                None => {
                    if let Some(decoder) = state.decoder.take() {
                        let summary = decoder.finish();
                        debug!(
                            "Stream closed: started={} terminated={} skipped={}",
                            summary.started, summary.terminated, summary.skipped_frames
                        );
                        state.queue.extend(summary.warnings().into_iter().map(Err));
                    }
                }
            }

            if state.is_done() && state.queue.is_empty() {
                return None;
            }
        }
    });

    Box::pin(events)
}
