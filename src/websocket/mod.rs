//! Reconnecting duplex channel.
//!
//! [`DuplexChannel::connect`] spawns a background task that owns one logical
//! connection: it connects, delivers inbound JSON messages and reconnects
//! after failures until the attempt budget is spent. The caller talks
//! to it through a [`ChannelHandle`].

pub mod channel;
pub mod state;

pub use channel::{ChannelHandle, DuplexChannel};
pub use state::{ChannelEvent, ChannelState, CloseReason};
