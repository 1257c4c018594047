//! Server-Sent Events encoding and decoding.
//!
//! Pure, no-I/O SSE implementation used by both the server (encoding events
//! onto the wire) and the client (parsing a streamed response body).
//!
//! SSE messages consist of `field: value` lines terminated by a blank line:
//!
//! ```text
//! id: event-123
//! event: message
//! data: {"jsonrpc": "2.0", ...}
//!
//! ```

/// A Server-Sent Event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Event ID, used for `Last-Event-ID` resumption.
    pub id: Option<String>,
    /// Event type; SSE clients default this to `"message"`.
    pub event: Option<String>,
    /// Event data, possibly multiline.
    pub data: String,
    /// Suggested client reconnect delay in milliseconds.
    pub retry: Option<u32>,
}

impl SseEvent {
    /// A plain data-only event.
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            id: None,
            event: None,
            data: data.into(),
            retry: None,
        }
    }

    /// An event carrying a replay id.
    pub fn with_id(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            event: None,
            data: data.into(),
            retry: None,
        }
    }

    /// A builder for events with an explicit type and retry hint.
    pub fn builder() -> SseEventBuilder {
        SseEventBuilder::default()
    }
}

/// Builder for [`SseEvent`].
#[derive(Default)]
pub struct SseEventBuilder {
    id: Option<String>,
    event: Option<String>,
    data: Option<String>,
    retry: Option<u32>,
}

impl SseEventBuilder {
    /// Set the event id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the event type.
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Set the event data.
    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the retry hint in milliseconds.
    pub fn retry(mut self, retry_ms: u32) -> Self {
        self.retry = Some(retry_ms);
        self
    }

    /// Build the event.
    ///
    /// # Panics
    ///
    /// Panics if `data` was never set.
    pub fn build(self) -> SseEvent {
        SseEvent {
            id: self.id,
            event: self.event,
            data: self.data.expect("SseEvent requires data"),
            retry: self.retry,
        }
    }
}

/// Encodes [`SseEvent`]s to wire format.
pub struct SseEncoder;

impl SseEncoder {
    /// Encode an event to bytes.
    pub fn encode(event: &SseEvent) -> Vec<u8> {
        Self::encode_string(event).into_bytes()
    }

    /// Encode an event to a string.
    pub fn encode_string(event: &SseEvent) -> String {
        let mut output = String::new();

        if let Some(ref id) = event.id {
            output.push_str("id: ");
            output.push_str(id);
            output.push('\n');
        }
        if let Some(ref event_type) = event.event {
            output.push_str("event: ");
            output.push_str(event_type);
            output.push('\n');
        }
        if let Some(retry) = event.retry {
            output.push_str("retry: ");
            output.push_str(&retry.to_string());
            output.push('\n');
        }
        for line in event.data.lines() {
            output.push_str("data: ");
            output.push_str(line);
            output.push('\n');
        }
        output.push('\n');
        output
    }

    /// Encode a keepalive comment, ignored by clients but kept to hold the
    /// connection open through idle proxies.
    pub fn encode_keepalive() -> Vec<u8> {
        b":\n\n".to_vec()
    }
}

/// Incremental SSE parser, fed chunks as they arrive over the wire.
pub struct SseParser {
    buffer: String,
    current_id: Option<String>,
    current_event: Option<String>,
    current_data: Vec<String>,
    current_retry: Option<u32>,
}

impl SseParser {
    /// Create a new, empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning any complete events it produced.
    ///
    /// Invalid UTF-8 is dropped silently; SSE is a text format and a stream
    /// that can't decode as UTF-8 has nothing further to offer.
    pub fn feed(&mut self, data: &[u8]) -> Vec<SseEvent> {
        let Ok(chunk) = std::str::from_utf8(data) else {
            return Vec::new();
        };
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer[..newline_pos].trim_end_matches('\r').to_string();
            self.buffer.drain(..=newline_pos);

            if line.is_empty() {
                if let Some(event) = self.emit_event() {
                    events.push(event);
                }
            } else if line.starts_with(':') {
                // Comment; ignored.
            } else if let Some(colon_pos) = line.find(':') {
                let field = &line[..colon_pos];
                let value = line[colon_pos + 1..].trim_start();
                match field {
                    "id" => self.current_id = Some(value.to_string()),
                    "event" => self.current_event = Some(value.to_string()),
                    "data" => self.current_data.push(value.to_string()),
                    "retry" => {
                        if let Ok(ms) = value.parse() {
                            self.current_retry = Some(ms);
                        }
                    }
                    _ => {}
                }
            }
        }
        events
    }

    fn emit_event(&mut self) -> Option<SseEvent> {
        if self.current_data.is_empty() {
            self.current_id = None;
            self.current_event = None;
            self.current_retry = None;
            return None;
        }
        let event = SseEvent {
            id: self.current_id.take(),
            event: self.current_event.take(),
            data: self.current_data.join("\n"),
            retry: self.current_retry.take(),
        };
        self.current_data.clear();
        Some(event)
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            current_id: None,
            current_event: None,
            current_data: Vec::new(),
            current_retry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_simple_message() {
        let event = SseEvent::message("hello");
        assert_eq!(SseEncoder::encode_string(&event), "data: hello\n\n");
    }

    #[test]
    fn encodes_full_event() {
        let event = SseEvent::builder()
            .id("evt-1")
            .event("update")
            .data("line1\nline2")
            .retry(5000)
            .build();

        assert_eq!(
            SseEncoder::encode_string(&event),
            "id: evt-1\nevent: update\nretry: 5000\ndata: line1\ndata: line2\n\n"
        );
    }

    #[test]
    fn roundtrips_through_parser() {
        let original = SseEvent::builder()
            .id("round-trip-1")
            .event("test")
            .data("multiline\ndata\nhere")
            .build();

        let encoded = SseEncoder::encode(&original);
        let mut parser = SseParser::new();
        let events = parser.feed(&encoded);

        assert_eq!(events, vec![original]);
    }

    #[test]
    fn parser_handles_incremental_feeds() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"id: 1\n").is_empty());
        assert!(parser.feed(b"data: partial\n").is_empty());

        let events = parser.feed(b"\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, Some("1".to_string()));
        assert_eq!(events[0].data, "partial");
    }

    #[test]
    fn parser_ignores_comments_and_keepalives() {
        let mut parser = SseParser::new();
        let events = parser.feed(&SseEncoder::encode_keepalive());
        assert!(events.is_empty());

        let events = parser.feed(b": comment\ndata: actual\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "actual");
    }

    #[test]
    fn parser_splits_multiple_events_in_one_feed() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: first\n\ndata: second\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "first");
        assert_eq!(events[1].data, "second");
    }
}
