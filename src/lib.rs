//! portal-net - resilient network access layer for the investor-relations portal
//!
//! - [`auth`]: session store and the authenticated HTTP client (refresh-then-retry)
//! - [`sse`] and [`stream_client`]: chat stream decoding
//! - [`websocket`]: reconnecting duplex channel
//! - [`traits`] and [`adapters`]: transport seams and their implementations

pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod sse;
pub mod stream_client;
pub mod traits;
pub mod websocket;
