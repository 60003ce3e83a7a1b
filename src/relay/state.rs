use crate::llm::ChatMessage;

/// Number of leading emissions during which newline-only deltas are dropped
pub const PRIMING_WINDOW: usize = 2;

/// Per-stream accumulation, created when a stream starts and discarded when
/// it ends
#[derive(Debug, Default)]
pub struct StreamState {
    emitted: usize,
    accumulated: String,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a delta through the priming filter
    ///
    /// Returns the delta if it should be forwarded, after appending it to the
    /// accumulated text. Suppressed deltas leave the state untouched, so the
    /// window only closes once two deltas have actually been emitted.
    pub fn admit(&mut self, delta: String) -> Option<String> {
        if self.emitted < PRIMING_WINDOW && is_priming_artifact(&delta) {
            return None;
        }

        self.accumulated.push_str(&delta);
        self.emitted += 1;
        Some(delta)
    }

    /// Deltas forwarded so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Concatenation of every forwarded delta
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// The system turn that completes this stream
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::system(self.accumulated)
    }
}

/// One or more line breaks and nothing else
pub fn is_priming_artifact(delta: &str) -> bool {
    !delta.is_empty() && delta.chars().all(|c| c == '\n' || c == '\r')
}
