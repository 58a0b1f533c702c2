//! Mock WebSocket connector for testing.
//!
//! Each accepted connection is backed by in-memory channels. The test holds
//! the server side as a [`MockSocketPeer`] and can push frames, inject errors,
//! or drop the connection to simulate an abnormal close.

use async_trait::async_trait;
use futures::channel::mpsc as futures_mpsc;
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::traits::{CloseFrame, SocketConnector, SocketFrame, SocketPair, TransportError};

/// What the next `connect` call should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Complete the handshake and hand a peer to the test
    Accept,
    /// Fail the handshake with this message
    Refuse(String),
}

/// Server side of one mock connection.
pub struct MockSocketPeer {
    /// URL the client connected to
    pub url: String,
    to_client: futures_mpsc::UnboundedSender<Result<SocketFrame, TransportError>>,
    from_client: futures_mpsc::UnboundedReceiver<SocketFrame>,
}

impl MockSocketPeer {
    /// Push a text frame to the client.
    pub fn send_text(&self, text: &str) {
        self.send_frame(SocketFrame::Text(text.to_string()));
    }

    /// Push a JSON text frame to the client.
    pub fn send_json(&self, value: &serde_json::Value) {
        self.send_text(&value.to_string());
    }

    pub fn send_frame(&self, frame: SocketFrame) {
        // A closed client side is not an error for the test driver
        let _ = self.to_client.unbounded_send(Ok(frame));
    }

    /// Make the client's read half fail.
    pub fn fail(&self, error: TransportError) {
        let _ = self.to_client.unbounded_send(Err(error));
    }

    /// Send a close frame with the given code.
    pub fn close(&self, code: u16, reason: &str) {
        self.send_frame(SocketFrame::Close(Some(CloseFrame {
            code,
            reason: reason.to_string(),
        })));
    }

    /// Drop the connection without a close frame.
    pub fn disconnect(self) {
        drop(self);
    }

    /// Next frame sent by the client, or `None` once the client side is gone.
    pub async fn recv(&mut self) -> Option<SocketFrame> {
        self.from_client.next().await
    }
}

/// Scripted connector for testing the duplex channel.
///
/// # Example
///
/// ```ignore
/// use portal_net::adapters::mock::{ConnectOutcome, MockSocketConnector};
///
/// let connector = MockSocketConnector::new();
/// connector.script([ConnectOutcome::Refuse("down".into()), ConnectOutcome::Accept]);
/// // ... start a channel with Arc::new(connector.clone()) ...
/// let peer = connector.next_peer().await.unwrap();
/// peer.send_text(r#"{"type":"ready"}"#);
/// ```
#[derive(Clone)]
pub struct MockSocketConnector {
    /// Outcomes consumed in order; `Accept` once exhausted
    script: Arc<Mutex<VecDeque<ConnectOutcome>>>,
    /// Every URL passed to `connect`, refused or not
    attempts: Arc<Mutex<Vec<String>>>,
    peers_tx: mpsc::UnboundedSender<MockSocketPeer>,
    peers_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<MockSocketPeer>>>,
}

impl MockSocketConnector {
    pub fn new() -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            attempts: Arc::new(Mutex::new(Vec::new())),
            peers_tx,
            peers_rx: Arc::new(tokio::sync::Mutex::new(peers_rx)),
        }
    }

    /// Append outcomes for upcoming connection attempts.
    pub fn script<I: IntoIterator<Item = ConnectOutcome>>(&self, outcomes: I) {
        self.script.lock().unwrap().extend(outcomes);
    }

    /// Number of `connect` calls made so far.
    pub fn connect_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// URLs of all `connect` calls made so far.
    pub fn connected_urls(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Wait for the next accepted connection.
    pub async fn next_peer(&self) -> Option<MockSocketPeer> {
        self.peers_rx.lock().await.recv().await
    }
}

impl Default for MockSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SocketConnector for MockSocketConnector {
    async fn connect(&self, url: &str) -> Result<SocketPair, TransportError> {
        self.attempts.lock().unwrap().push(url.to_string());

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectOutcome::Accept);

        if let ConnectOutcome::Refuse(message) = outcome {
            return Err(TransportError::Connect(message));
        }

        let (to_client, client_rx) = futures_mpsc::unbounded();
        let (client_tx, from_client) = futures_mpsc::unbounded();

        let peer = MockSocketPeer {
            url: url.to_string(),
            to_client,
            from_client,
        };
        let _ = self.peers_tx.send(peer);

        // Answer pings the way a real WebSocket transport does
        let pong_tx = client_tx.clone();
        let stream = client_rx.inspect(move |frame| {
            if let Ok(SocketFrame::Ping(data)) = frame {
                let _ = pong_tx.unbounded_send(SocketFrame::Pong(data.clone()));
            }
        });

        Ok(SocketPair {
            sink: Box::pin(client_tx.sink_map_err(|_| TransportError::Closed)),
            stream: Box::pin(stream),
        })
    }
}
