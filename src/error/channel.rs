//! Duplex channel errors.

use thiserror::Error;

use super::ErrorCategory;
use crate::traits::TransportError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The handshake did not complete.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An open connection ended without `close()`.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The reconnect budget is spent; the channel is closed for good.
    #[error("Channel closed after {attempts} failed connection attempts")]
    Exhausted { attempts: u32 },

    #[error("Channel is not open")]
    NotOpen,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Malformed inbound message: {0}")]
    MalformedMessage(String),

    #[error("Failed to encode outbound message: {0}")]
    Serialization(String),
}

impl ChannelError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChannelError::ConnectionFailed(_)
            | ChannelError::ConnectionLost(_)
            | ChannelError::Exhausted { .. }
            | ChannelError::SendFailed(_) => ErrorCategory::Network,
            ChannelError::NotOpen | ChannelError::Serialization(_) => ErrorCategory::Client,
            ChannelError::MalformedMessage(_) => ErrorCategory::Protocol,
        }
    }
}

impl From<TransportError> for ChannelError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect(msg) => ChannelError::ConnectionFailed(msg),
            other => ChannelError::ConnectionLost(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        ChannelError::Serialization(err.to_string())
    }
}
