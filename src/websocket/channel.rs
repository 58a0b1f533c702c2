use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::state::{ChannelEvent, ChannelState, CloseReason};
use crate::auth::SessionStore;
use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::traits::{CloseFrame, SocketConnector, SocketFrame, SocketPair, SocketSink};

const EVENT_BUFFER: usize = 100;
const OUTGOING_BUFFER: usize = 100;

/// Factory for reconnecting duplex channels.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use portal_net::adapters::TungsteniteConnector;
/// use portal_net::config::ChannelConfig;
/// use portal_net::websocket::{ChannelEvent, DuplexChannel};
///
/// let channel = DuplexChannel::new(store, Arc::new(TungsteniteConnector), ChannelConfig::default());
/// let mut handle = channel.connect("company-42");
/// while let Some(event) = handle.recv().await {
///     if let ChannelEvent::Message(msg) = event {
///         println!("{}", msg);
///     }
/// }
/// ```
#[derive(Clone)]
pub struct DuplexChannel {
    store: Arc<SessionStore>,
    connector: Arc<dyn SocketConnector>,
    config: ChannelConfig,
}

impl DuplexChannel {
    pub fn new(
        store: Arc<SessionStore>,
        connector: Arc<dyn SocketConnector>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            store,
            connector,
            config,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// URL for `target_id`, carrying `token` as a query parameter when present.
    pub fn channel_url(&self, target_id: &str, token: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(target_id)
        );
        if let Some(token) = token {
            url.push('?');
            url.push_str(&urlencoding::encode(&self.config.token_param));
            url.push('=');
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    /// Open a channel to `target_id` in the background.
    ///
    /// The access token is read once here and reused for every reconnect.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, target_id: &str) -> ChannelHandle {
        let token = self.store.access_token();
        if token.is_none() {
            warn!("Opening channel to {} without a session", target_id);
        }
        let url = self.channel_url(target_id, token.as_deref());

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_BUFFER);
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting { attempt: 1 });
        let (shutdown_tx, shutdown_rx) = watch::channel(None);

        let task = ChannelTask {
            target_id: target_id.to_string(),
            url,
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
            events_tx,
            outgoing_rx,
            state_tx,
            shutdown_rx,
        };
        tokio::spawn(task.run());

        ChannelHandle {
            target_id: target_id.to_string(),
            outgoing_tx,
            events_rx,
            state_rx,
            shutdown_tx,
        }
    }
}

/// Consumer side of one channel.
///
/// Dropping the handle closes the channel.
pub struct ChannelHandle {
    target_id: String,
    outgoing_tx: mpsc::Sender<String>,
    events_rx: mpsc::Receiver<ChannelEvent>,
    state_rx: watch::Receiver<ChannelState>,
    shutdown_tx: watch::Sender<Option<CloseReason>>,
}

impl ChannelHandle {
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send `message` as a JSON text frame.
    pub async fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::NotOpen);
        }
        let json = serde_json::to_string(message)?;
        self.outgoing_tx
            .send(json)
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    /// Next inbound event. `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events_rx.recv().await
    }

    pub fn state(&self) -> ChannelState {
        self.state_rx.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.state_rx.borrow().is_open()
    }

    /// Subscribe to state changes
    pub fn state_receiver(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Close the channel. Cancels a pending reconnect.
    pub fn close(&self) {
        info!("Closing channel to {}", self.target_id);
        self.request_shutdown(CloseReason::Requested);
    }

    /// Wait until the channel is closed and return why.
    pub async fn closed(&self) -> CloseReason {
        let mut state_rx = self.state_rx.clone();
        loop {
            if let ChannelState::Closed(reason) = *state_rx.borrow_and_update() {
                return reason;
            }
            if state_rx.changed().await.is_err() {
                // Task gone without reporting a final state
                return CloseReason::HandleDropped;
            }
        }
    }

    fn request_shutdown(&self, reason: CloseReason) {
        self.shutdown_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.request_shutdown(CloseReason::HandleDropped);
    }
}

/// How an open connection ended.
enum SessionEnd {
    Shutdown(CloseReason),
    Lost(ChannelError),
}

/// Background task owning the connection lifecycle.
struct ChannelTask {
    target_id: String,
    url: String,
    connector: Arc<dyn SocketConnector>,
    config: ChannelConfig,
    events_tx: mpsc::Sender<ChannelEvent>,
    outgoing_rx: mpsc::Receiver<String>,
    state_tx: watch::Sender<ChannelState>,
    shutdown_rx: watch::Receiver<Option<CloseReason>>,
}

impl ChannelTask {
    async fn run(mut self) {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        let reason = loop {
            self.set_state(ChannelState::Connecting { attempt });
            info!(
                "Connecting channel to {} (attempt {} of {})",
                self.target_id, attempt, max_attempts
            );

            let connector = Arc::clone(&self.connector);
            let connected = tokio::select! {
                biased;
                reason = wait_shutdown(&mut self.shutdown_rx) => break reason,
                result = connector.connect(&self.url) => result,
            };

            let failure = match connected {
                Ok(pair) => {
                    info!("Channel to {} open", self.target_id);
                    self.set_state(ChannelState::Open);
                    match self.run_open(pair).await {
                        SessionEnd::Shutdown(reason) => break reason,
                        SessionEnd::Lost(err) => {
                            warn!("Channel to {} lost: {}", self.target_id, err);
                            self.discard_outgoing();
                            err
                        }
                    }
                }
                Err(e) => {
                    warn!("Connection attempt {} to {} failed: {}", attempt, self.target_id, e);
                    ChannelError::from(e)
                }
            };

            if attempt >= max_attempts {
                error!(
                    "Channel to {} closed after {} attempts, giving up",
                    self.target_id, attempt
                );
                self.set_state(ChannelState::Closed(CloseReason::Exhausted));
                let exhausted = ChannelEvent::Exhausted {
                    attempts: attempt,
                    last_error: failure,
                };
                if let Some(reason) = self.emit(exhausted).await {
                    debug!("Channel to {} shut down ({:?}) before exhaustion was read", self.target_id, reason);
                }
                return;
            }

            attempt += 1;
            self.set_state(ChannelState::Connecting { attempt });
            let delay = self.config.delay_before(attempt);
            info!(
                "Reconnecting to {} in {}ms (attempt {} of {})",
                self.target_id,
                delay.as_millis(),
                attempt,
                max_attempts
            );

            tokio::select! {
                biased;
                reason = wait_shutdown(&mut self.shutdown_rx) => break reason,
                _ = tokio::time::sleep(delay) => {}
            }
        };

        self.set_state(ChannelState::Closed(reason));
        info!("Channel to {} closed ({:?})", self.target_id, reason);
    }

    /// Pump one open connection until it is lost or shutdown is requested.
    ///
    /// Ping replies are left to the transport.
    async fn run_open(&mut self, pair: SocketPair) -> SessionEnd {
        let SocketPair {
            mut sink,
            mut stream,
        } = pair;

        loop {
            let event = tokio::select! {
                biased;
                reason = wait_shutdown(&mut self.shutdown_rx) => {
                    return self.shut_down(&mut sink, reason).await;
                }
                frame = stream.next() => match frame {
                    Some(Ok(SocketFrame::Text(text))) => Some(self.decode(text)),
                    Some(Ok(SocketFrame::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => Some(self.decode(text)),
                        Err(e) => Some(self.malformed(
                            String::from_utf8_lossy(e.as_bytes()).into_owned(),
                            e.to_string(),
                        )),
                    },
                    Some(Ok(SocketFrame::Ping(_) | SocketFrame::Pong(_))) => None,
                    Some(Ok(SocketFrame::Close(frame))) => {
                        let code = frame.map(|f| f.code).unwrap_or(1005);
                        return SessionEnd::Lost(ChannelError::ConnectionLost(format!(
                            "server closed the connection ({})",
                            code
                        )));
                    }
                    Some(Err(e)) => return SessionEnd::Lost(e.into()),
                    None => {
                        return SessionEnd::Lost(ChannelError::ConnectionLost(
                            "connection ended".to_string(),
                        ))
                    }
                },
                outgoing = self.outgoing_rx.recv() => match outgoing {
                    Some(json) => {
                        if let Err(e) = sink.send(SocketFrame::Text(json)).await {
                            return SessionEnd::Lost(e.into());
                        }
                        None
                    }
                    // Handle gone; its Drop has requested shutdown
                    None => return SessionEnd::Shutdown(CloseReason::HandleDropped),
                },
            };

            if let Some(event) = event {
                if let Some(reason) = self.emit(event).await {
                    return self.shut_down(&mut sink, reason).await;
                }
            }
        }
    }

    /// Send a close frame and release the connection.
    async fn shut_down(&self, sink: &mut SocketSink, reason: CloseReason) -> SessionEnd {
        self.set_state(ChannelState::Closing);
        debug!("Sending close frame to {}", self.target_id);
        let _ = sink.send(SocketFrame::Close(Some(CloseFrame::normal()))).await;
        let _ = sink.close().await;
        SessionEnd::Shutdown(reason)
    }

    /// Hand `event` to the consumer.
    ///
    /// Waits while the consumer's buffer is full, but returns the reason as
    /// soon as shutdown is requested. The event is then dropped.
    async fn emit(&mut self, event: ChannelEvent) -> Option<CloseReason> {
        tokio::select! {
            biased;
            reason = wait_shutdown(&mut self.shutdown_rx) => Some(reason),
            _ = self.events_tx.send(event) => None,
        }
    }

    fn decode(&self, text: String) -> ChannelEvent {
        match serde_json::from_str(&text) {
            Ok(value) => ChannelEvent::Message(value),
            Err(e) => self.malformed(text, e.to_string()),
        }
    }

    fn malformed(&self, raw: String, reason: String) -> ChannelEvent {
        warn!("Malformed message on channel to {}: {}", self.target_id, reason);
        ChannelEvent::MalformedMessage { raw, reason }
    }

    /// Drop messages queued for a connection that no longer exists.
    fn discard_outgoing(&mut self) {
        let mut dropped = 0;
        while self.outgoing_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!("Dropped {} unsent messages for {}", dropped, self.target_id);
        }
    }

    fn set_state(&self, state: ChannelState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!("Channel to {}: {:?} -> {:?}", self.target_id, current, state);
            *current = state.clone();
            true
        });
    }
}

/// Resolve once shutdown is requested or the handle is gone.
async fn wait_shutdown(shutdown_rx: &mut watch::Receiver<Option<CloseReason>>) -> CloseReason {
    loop {
        let requested = *shutdown_rx.borrow_and_update();
        if let Some(reason) = requested {
            return reason;
        }
        if shutdown_rx.changed().await.is_err() {
            let last = *shutdown_rx.borrow();
            return last.unwrap_or(CloseReason::HandleDropped);
        }
    }
}
