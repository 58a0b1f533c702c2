//! Channel lifecycle states and inbound events.

use serde_json::Value;

use crate::error::ChannelError;

/// Why a channel reached [`ChannelState::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// `ChannelHandle::close` was called
    Requested,
    /// Every allowed connection attempt failed or was lost
    Exhausted,
    /// The handle was dropped without calling `close`
    HandleDropped,
}

/// Connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    /// Attempt `attempt` (1-based) is connecting or waiting to connect
    Connecting { attempt: u32 },
    Open,
    Closing,
    Closed(CloseReason),
}

impl ChannelState {
    pub fn is_open(&self) -> bool {
        matches!(self, ChannelState::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelState::Closed(_))
    }
}

/// Something the channel delivers to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A JSON message from the server
    Message(Value),
    /// A frame that was not valid JSON; the connection stays up
    MalformedMessage { raw: String, reason: String },
    /// The reconnect budget is spent and the channel is closed
    Exhausted {
        attempts: u32,
        /// Failure of the final attempt
        last_error: ChannelError,
    },
}

impl ChannelEvent {
    /// The event as a [`ChannelError`], for consumers that route failures
    /// through one error path. `Message` is not an error.
    pub fn error(&self) -> Option<ChannelError> {
        match self {
            ChannelEvent::Message(_) => None,
            ChannelEvent::MalformedMessage { reason, .. } => {
                Some(ChannelError::MalformedMessage(reason.clone()))
            }
            ChannelEvent::Exhausted { attempts, .. } => Some(ChannelError::Exhausted {
                attempts: *attempts,
            }),
        }
    }
}
