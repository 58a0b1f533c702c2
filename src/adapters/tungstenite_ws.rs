//! Tungstenite-based WebSocket connector.
//!
//! Production implementation of [`SocketConnector`] using tokio-tungstenite.

use async_trait::async_trait;
use futures::future;
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;

use crate::traits::{CloseFrame, SocketConnector, SocketFrame, SocketPair, TransportError};

/// WebSocket connector using tokio-tungstenite.
///
/// `ws://` and `wss://` URLs are both supported.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

fn convert_error(err: WsError) -> TransportError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        WsError::Io(e) => TransportError::Io(e.to_string()),
        WsError::Protocol(e) => TransportError::Protocol(e.to_string()),
        other => TransportError::Io(other.to_string()),
    }
}

fn to_message(frame: SocketFrame) -> Message {
    match frame {
        SocketFrame::Text(text) => Message::Text(text),
        SocketFrame::Binary(data) => Message::Binary(data),
        SocketFrame::Ping(data) => Message::Ping(data),
        SocketFrame::Pong(data) => Message::Pong(data),
        SocketFrame::Close(close) => Message::Close(close.map(|c| WsCloseFrame {
            code: CloseCode::from(c.code),
            reason: Cow::Owned(c.reason),
        })),
    }
}

/// Raw `Message::Frame` values never surface when reading, so they map to `None`.
fn from_message(message: Message) -> Option<SocketFrame> {
    match message {
        Message::Text(text) => Some(SocketFrame::Text(text)),
        Message::Binary(data) => Some(SocketFrame::Binary(data)),
        Message::Ping(data) => Some(SocketFrame::Ping(data)),
        Message::Pong(data) => Some(SocketFrame::Pong(data)),
        Message::Close(close) => Some(SocketFrame::Close(close.map(|c| CloseFrame {
            code: u16::from(c.code),
            reason: c.reason.into_owned(),
        }))),
        Message::Frame(_) => None,
    }
}

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<SocketPair, TransportError> {
        let (ws_stream, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!("WebSocket handshake completed with status {}", response.status());

        let (ws_sink, ws_stream) = ws_stream.split();

        let sink = ws_sink
            .sink_map_err(convert_error)
            .with(|frame: SocketFrame| future::ready(Ok::<_, TransportError>(to_message(frame))));

        let stream = ws_stream.filter_map(|result| {
            future::ready(match result {
                Ok(message) => from_message(message).map(Ok),
                Err(e) => Some(Err(convert_error(e))),
            })
        });

        Ok(SocketPair {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}
