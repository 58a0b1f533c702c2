//! Push stream decoding.
//!
//! Parses the chat stream format of the portal backend:
//! - `event: <name>` - optional event name line
//! - `data: <json>` - payload line, JSON with a `type` field
//! - Empty line - ends the frame
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `events` - [`StreamEvent`], [`FrameKind`], [`DecodeSummary`]
//! - `parser` - line and block parsing, payload interpretation
//! - `decoder` - [`StreamDecoder`], the incremental byte-level decoder

mod decoder;
mod events;
mod parser;

pub use decoder::StreamDecoder;
pub use events::{DecodeSummary, FrameKind, StreamEvent};
pub use parser::{interpret, parse_block, parse_sse_line, FramePayload, RawFrame, SseLine};
