//! Error taxonomy for the network layer.
//!
//! - [`ApiError`]: request/response failures of the authenticated client
//! - [`StreamError`]: push-stream consumption, terminal or not
//! - [`ChannelError`]: duplex channel lifecycle and messaging
//! - [`ErrorCategory`]: coarse classification shared by all three
//!
//! Transport-level anomalies that do not invalidate an operation (one malformed
//! frame, one recoverable 401) are absorbed where they happen. Anything that
//! invalidates the operation reaches the caller as one of these types.

mod api;
mod category;
mod channel;
mod stream;

pub use api::ApiError;
pub use category::ErrorCategory;
pub use channel::ChannelError;
pub use stream::StreamError;

/// Result alias for authenticated client calls.
pub type ApiResult<T> = Result<T, ApiError>;
