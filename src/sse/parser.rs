//! Block and payload parsing.
//!
//! A block is the text between two blank lines. Lines inside it are:
//! - `event: <name>` - event name
//! - `data: <json>` - payload line; several are joined with `\n`
//! - `:<anything>` - comment (ignored)

use serde_json::Value;

use super::events::FrameKind;
use crate::error::StreamError;

const DEFAULT_ERROR_MESSAGE: &str = "Unknown stream error";

/// Classification of a single line within a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Event(String),
    Data(String),
    Comment(String),
    Empty,
}

/// Parse a single line into its component type.
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        return SseLine::Data(value.to_string());
    }

    // Unknown field - treat as comment
    SseLine::Comment(line.to_string())
}

/// Event name and joined data of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub event: Option<String>,
    pub data: Option<String>,
}

impl RawFrame {
    /// A block made only of comments or blank lines carries nothing.
    pub fn is_empty(&self) -> bool {
        self.event.is_none() && self.data.is_none()
    }
}

/// Collect the lines of one block.
pub fn parse_block(block: &str) -> RawFrame {
    let mut frame = RawFrame::default();
    let mut data_lines: Vec<String> = Vec::new();

    for line in block.split('\n') {
        match parse_sse_line(line) {
            SseLine::Event(name) => frame.event = Some(name),
            SseLine::Data(data) => data_lines.push(data),
            SseLine::Comment(_) | SseLine::Empty => {}
        }
    }

    if !data_lines.is_empty() {
        frame.data = Some(data_lines.join("\n"));
    }
    frame
}

/// A frame with its payload read, before decoder state is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Start,
    Content { fragment: String },
    /// `text` is `None` when the server left the final text to the client
    End { text: Option<String> },
    Error { message: String },
}

impl FramePayload {
    pub fn kind(&self) -> FrameKind {
        match self {
            FramePayload::Start => FrameKind::Start,
            FramePayload::Content { .. } => FrameKind::Content,
            FramePayload::End { .. } => FrameKind::End,
            FramePayload::Error { .. } => FrameKind::Error,
        }
    }
}

/// Read the JSON payload of a frame and dispatch on its `type`.
pub fn interpret(frame: &RawFrame) -> Result<FramePayload, StreamError> {
    let event_name = frame.event.as_deref().unwrap_or("message");

    let data = frame
        .data
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| malformed(format!("missing data for event '{}'", event_name)))?;

    let json: Value = serde_json::from_str(data)
        .map_err(|e| malformed(format!("invalid JSON for event '{}': {}", event_name, e)))?;

    let type_name = json
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(format!("missing type for event '{}'", event_name)))?;

    let kind = FrameKind::from_type(type_name)
        .ok_or_else(|| malformed(format!("unknown frame type '{}'", type_name)))?;

    match kind {
        FrameKind::Start => Ok(FramePayload::Start),
        FrameKind::Content => {
            let fragment = first_string(&json, &["content", "text", "data", "chunk", "token"])
                .ok_or_else(|| malformed("content frame without text".to_string()))?;
            Ok(FramePayload::Content { fragment })
        }
        FrameKind::End => Ok(FramePayload::End {
            text: first_string(&json, &["content", "full_response", "text"]),
        }),
        FrameKind::Error => Ok(FramePayload::Error {
            message: first_string(&json, &["message", "error", "detail"])
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
        }),
    }
}

fn first_string(json: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| json.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn malformed(reason: String) -> StreamError {
    StreamError::MalformedFrame { reason }
}
