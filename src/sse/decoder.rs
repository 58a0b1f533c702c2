//! Incremental stream decoder.
//!
//! Turns arbitrarily chunked bytes into [`StreamEvent`]s. The emitted events
//! depend only on the byte sequence, never on where the chunks were split.

use tracing::{debug, warn};

use super::events::{DecodeSummary, StreamEvent};
use super::parser::{interpret, parse_block, FramePayload};

const FRAME_DELIMITER: &str = "\n\n";

/// Stateful decoder for one push stream.
///
/// # Example
///
/// ```ignore
/// use portal_net::sse::{StreamDecoder, StreamEvent};
///
/// let mut decoder = StreamDecoder::new();
/// let mut events = decoder.feed(b"data: {\"type\":\"content\",\"content\":\"Hel");
/// events.extend(decoder.feed(b"lo\"}\n\n"));
/// assert_eq!(events, vec![StreamEvent::Content { text: "Hello".into() }]);
/// ```
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk
    pending: Vec<u8>,
    /// Decoded text that does not yet contain a complete block
    buffer: String,
    /// Offset in `buffer` before which no delimiter can start
    scanned: usize,
    /// A trailing `\r` held back until the next chunk shows whether `\n` follows
    pending_cr: bool,
    full_response: String,
    started: bool,
    terminated: bool,
    skipped_frames: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk and return every event it completes, in order.
    ///
    /// Only text appended since the last call is scanned for delimiters.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let text = self.decode_utf8(chunk);
        self.append_normalized(text);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[self.scanned..].find(FRAME_DELIMITER) {
            let end = self.scanned + offset;
            let block = self.buffer[consumed..end].to_string();
            consumed = end + FRAME_DELIMITER.len();
            self.scanned = consumed;
            if let Some(event) = self.handle_block(&block) {
                events.push(event);
            }
        }
        self.buffer.drain(..consumed);

        // A delimiter can only straddle chunks through a trailing newline
        self.scanned = if self.buffer.ends_with('\n') {
            self.buffer.len() - 1
        } else {
            self.buffer.len()
        };
        events
    }

    /// End the stream. Unframed trailing bytes are dropped.
    pub fn finish(self) -> DecodeSummary {
        let leftover =
            self.pending.len() + self.buffer.trim().len() + usize::from(self.pending_cr);
        if leftover > 0 {
            debug!("Discarding {} bytes of unterminated stream data", leftover);
        }
        DecodeSummary {
            started: self.started,
            terminated: self.terminated,
            skipped_frames: self.skipped_frames,
            full_response: self.full_response,
        }
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Whether an `end` or `error` frame has been seen.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn skipped_frames(&self) -> usize {
        self.skipped_frames
    }

    /// Text accumulated from `content` frames so far.
    pub fn full_response(&self) -> &str {
        &self.full_response
    }

    /// Decode as much of `pending` + `chunk` as forms complete characters.
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + invalid);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return text;
                        }
                    }
                }
            }
        }
    }

    /// Append `text` with CRLF folded to LF. Only the new text is rewritten.
    fn append_normalized(&mut self, mut text: String) {
        if std::mem::take(&mut self.pending_cr) {
            text.insert(0, '\r');
        }
        if text.ends_with('\r') {
            text.pop();
            self.pending_cr = true;
        }
        if text.contains("\r\n") {
            text = text.replace("\r\n", "\n");
        }
        self.buffer.push_str(&text);
    }

    fn handle_block(&mut self, block: &str) -> Option<StreamEvent> {
        if self.terminated {
            return None;
        }

        let raw = parse_block(block);
        if raw.is_empty() {
            return None;
        }

        let payload = match interpret(&raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping stream frame: {}", e);
                self.skipped_frames += 1;
                return None;
            }
        };

        let event = match payload {
            FramePayload::Start => {
                self.started = true;
                StreamEvent::Start
            }
            FramePayload::Content { fragment } => {
                self.full_response.push_str(&fragment);
                StreamEvent::Content { text: fragment }
            }
            FramePayload::End { text } => {
                self.terminated = true;
                StreamEvent::End {
                    text: text.unwrap_or_else(|| self.full_response.clone()),
                }
            }
            FramePayload::Error { message } => {
                self.terminated = true;
                StreamEvent::Error { message }
            }
        };
        Some(event)
    }
}
