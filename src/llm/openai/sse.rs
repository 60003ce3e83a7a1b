//! Incremental Server-Sent Events (SSE) decoding
//!
//! Network chunks never line up with event boundaries, so decoding happens in
//! two persistent stages:
//!
//! 1. [`Utf8Decoder`] turns raw bytes into text, holding back a code point
//!    that was split across chunks.
//! 2. [`SseParser`] turns text into complete events, holding back a partial
//!    line and the fields of an event whose terminating blank line has not
//!    arrived yet.
//!
//! ```
//! use chat_relay::llm::openai::sse::SseParser;
//!
//! let mut parser = SseParser::new();
//! assert!(parser.feed("data: {\"a\"").is_empty());
//! let events = parser.feed(":1}\n\n");
//! assert_eq!(events[0].data, "{\"a\":1}");
//! ```

use crate::llm::core::error::LlmError;

/// Decodes a byte stream as UTF-8 without requiring chunk boundaries to fall
/// between code points
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode the next chunk
    ///
    /// Returns all text that is complete so far. Trailing bytes of an
    /// incomplete code point are kept for the next call.
    ///
    /// # Errors
    /// Returns `LlmError::StreamError` if the bytes are not valid UTF-8.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, LlmError> {
        self.pending.extend_from_slice(chunk);

        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_owned();
                self.pending.clear();
                return Ok(text);
            }
            Err(e) if e.error_len().is_some() => {
                return Err(LlmError::StreamError(format!(
                    "Invalid UTF-8 in stream: {}",
                    e
                )));
            }
            Err(e) => e.valid_up_to(),
        };

        let text = String::from_utf8_lossy(&self.pending[..valid_up_to]).into_owned();
        self.pending.drain(..valid_up_to);
        Ok(text)
    }

    /// Whether bytes of an unfinished code point are buffered
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// A complete SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Line-oriented SSE state machine
///
/// Follows the WHATWG event-stream interpretation rules: `\n`, `\r\n` and
/// `\r` all end a line, lines starting with `:` are comments, and an event is
/// dispatched on a blank line only if it carried data.
#[derive(Debug, Default)]
pub struct SseParser {
    /// Current line, not yet terminated
    line: String,
    /// Previous chunk ended in `\r`; a leading `\n` belongs to that line break
    after_cr: bool,
    /// First character of the stream has been seen (BOM handling)
    started: bool,
    data: String,
    has_data: bool,
    event_type: Option<String>,
}

impl SseParser {
    /// Create a parser at the start of a stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded text and collect every event it completes, in order
    pub fn feed(&mut self, text: &str) -> Vec<SseEvent> {
        let mut events = Vec::new();

        for ch in text.chars() {
            if !self.started {
                self.started = true;
                if ch == '\u{feff}' {
                    continue;
                }
            }

            if self.after_cr {
                self.after_cr = false;
                if ch == '\n' {
                    continue;
                }
            }

            match ch {
                '\r' => {
                    self.after_cr = true;
                    self.end_line(&mut events);
                }
                '\n' => self.end_line(&mut events),
                _ => self.line.push(ch),
            }
        }

        events
    }

    /// Whether a partial line or undispatched event fields are buffered
    pub fn has_partial_event(&self) -> bool {
        !self.line.is_empty() || self.has_data
    }

    fn end_line(&mut self, events: &mut Vec<SseEvent>) {
        let line = std::mem::take(&mut self.line);

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(pos) => {
                let value = &line[pos + 1..];
                (&line[..pos], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line.as_str(), ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event_type = Some(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event_type.take();
        if !self.has_data {
            return None;
        }

        self.has_data = false;
        Some(SseEvent {
            event,
            data: std::mem::take(&mut self.data),
        })
    }
}
