//! Typed frames produced by the stream decoder.

use std::fmt;

use crate::error::StreamError;

/// Frame type, as carried in the payload's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Start,
    Content,
    End,
    Error,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Start => "start",
            FrameKind::Content => "content",
            FrameKind::End => "end",
            FrameKind::Error => "error",
        }
    }

    /// Parse a `type` value. Unknown names return `None`.
    pub fn from_type(name: &str) -> Option<Self> {
        match name {
            "start" => Some(FrameKind::Start),
            "content" => Some(FrameKind::Content),
            "end" => Some(FrameKind::End),
            "error" => Some(FrameKind::Error),
            _ => None,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded event of a chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Generation has begun
    Start,
    /// Next fragment of the answer
    Content { text: String },
    /// Generation finished; `text` is the complete answer
    End { text: String },
    /// The server aborted generation
    Error { message: String },
}

impl StreamEvent {
    pub fn kind(&self) -> FrameKind {
        match self {
            StreamEvent::Start => FrameKind::Start,
            StreamEvent::Content { .. } => FrameKind::Content,
            StreamEvent::End { .. } => FrameKind::End,
            StreamEvent::Error { .. } => FrameKind::Error,
        }
    }

    /// Text carried by the event, if any.
    pub fn payload(&self) -> Option<&str> {
        match self {
            StreamEvent::Start => None,
            StreamEvent::Content { text } | StreamEvent::End { text } => Some(text),
            StreamEvent::Error { message } => Some(message),
        }
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End { .. } | StreamEvent::Error { .. })
    }
}

/// What a decoder saw over the lifetime of one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub started: bool,
    /// An `end` or `error` frame arrived
    pub terminated: bool,
    pub skipped_frames: usize,
    /// Concatenation of every `content` fragment
    pub full_response: String,
}

impl DecodeSummary {
    /// Non-fatal anomalies of the stream as a whole.
    pub fn warnings(&self) -> Vec<StreamError> {
        let mut warnings = Vec::new();
        if !self.started {
            warnings.push(StreamError::NeverStarted);
        }
        if !self.terminated {
            warnings.push(StreamError::ClosedBeforeEnd);
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_payload() {
        let content = StreamEvent::Content {
            text: "Hel".to_string(),
        };
        assert_eq!(content.kind(), FrameKind::Content);
        assert_eq!(content.payload(), Some("Hel"));
        assert!(!content.is_terminal());

        assert_eq!(StreamEvent::Start.payload(), None);
        assert!(StreamEvent::Error {
            message: "quota".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_frame_kind_names() {
        for kind in [FrameKind::Start, FrameKind::Content, FrameKind::End, FrameKind::Error] {
            assert_eq!(FrameKind::from_type(kind.as_str()), Some(kind));
        }
        assert_eq!(FrameKind::from_type("ping"), None);
        assert_eq!(FrameKind::End.to_string(), "end");
    }

    #[test]
    fn test_summary_warnings() {
        let clean = DecodeSummary {
            started: true,
            terminated: true,
            ..Default::default()
        };
        assert!(clean.warnings().is_empty());

        let truncated = DecodeSummary::default();
        assert_eq!(
            truncated.warnings(),
            vec![StreamError::NeverStarted, StreamError::ClosedBeforeEnd]
        );
    }
}
