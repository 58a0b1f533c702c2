//! Mock implementations for testing.
//!
//! Test doubles for the transport seams, so the clients and the channel can be
//! exercised without network access.
//!
//! - [`MockHttpClient`] - HTTP transport with scripted responses
//! - [`MockSocketConnector`] - WebSocket connector with scripted outcomes

pub mod http;
pub mod websocket;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use websocket::{ConnectOutcome, MockSocketConnector, MockSocketPeer};
