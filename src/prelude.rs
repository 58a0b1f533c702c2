//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use portal_net::prelude::*;
//! ```
//!
//! This will import:
//! - Session and HTTP client types (SessionStore, AuthenticatedClient, ApiRequest)
//! - Streaming types (StreamingRequestClient, StreamEvent)
//! - Channel types (DuplexChannel, ChannelHandle, ChannelEvent)
//! - Configuration and error types

// Authenticated HTTP
pub use crate::auth::{ApiRequest, ApiResponse, AuthenticatedClient, CredentialPair, SessionStore};

// Streaming
pub use crate::sse::{StreamDecoder, StreamEvent};
pub use crate::stream_client::{EventStream, StreamingRequestClient};

// Duplex channel
pub use crate::websocket::{ChannelEvent, ChannelHandle, ChannelState, CloseReason, DuplexChannel};

// Configuration
pub use crate::config::{ChannelConfig, ClientConfig, ReconnectPolicy};

// Errors
pub use crate::error::{ApiError, ApiResult, ChannelError, ErrorCategory, StreamError};

// Transports
pub use crate::adapters::{ReqwestHttpClient, TungsteniteConnector};
pub use crate::traits::{HttpClient, SocketConnector};
