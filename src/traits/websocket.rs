//! WebSocket transport trait abstraction.
//!
//! The duplex channel owns reconnection and message decoding; a connector only
//! opens one socket and hands back its two halves. This keeps the lifecycle logic
//! testable against scripted in-memory sockets.

use async_trait::async_trait;
use futures::{Sink, Stream};
use std::fmt;
use std::pin::Pin;

/// A WebSocket frame as seen by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketFrame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseFrame>),
}

/// Close code and reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    /// RFC 6455 normal closure.
    pub fn normal() -> Self {
        Self {
            code: 1000,
            reason: String::new(),
        }
    }
}

/// Socket transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Handshake or TCP connect failed
    Connect(String),
    /// The socket is already closed
    Closed,
    /// IO error on an open socket
    Io(String),
    /// Peer violated the WebSocket protocol
    Protocol(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(msg) => write!(f, "Connection failed: {}", msg),
            TransportError::Closed => write!(f, "Socket closed"),
            TransportError::Io(msg) => write!(f, "IO error: {}", msg),
            TransportError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Outgoing half of an open socket.
pub type SocketSink = Pin<Box<dyn Sink<SocketFrame, Error = TransportError> + Send>>;

/// Incoming half of an open socket.
pub type SocketStream = Pin<Box<dyn Stream<Item = Result<SocketFrame, TransportError>> + Send>>;

/// Both halves of one open socket.
pub struct SocketPair {
    pub sink: SocketSink,
    pub stream: SocketStream,
}

impl fmt::Debug for SocketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketPair").finish_non_exhaustive()
    }
}

/// Opens WebSocket connections.
///
/// # Example
///
/// ```ignore
/// use portal_net::traits::SocketConnector;
///
/// async fn probe<C: SocketConnector>(connector: &C) -> bool {
///     connector.connect("wss://portal.example.com/ws/chat/42").await.is_ok()
/// }
/// ```
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// Open one connection to `url`, completing the handshake.
    async fn connect(&self, url: &str) -> Result<SocketPair, TransportError>;
}
