//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP transport (buffered and streaming)
//! - [`SocketConnector`] - opens WebSocket connections for the duplex channel

pub mod http;
pub mod websocket;

pub use http::{
    ByteStream, FormPart, Headers, HttpClient, HttpError, HttpRequest, Method, RequestBody,
    Response, StreamingResponse,
};
pub use websocket::{
    CloseFrame, SocketConnector, SocketFrame, SocketPair, SocketSink, SocketStream,
    TransportError,
};
