//! Streaming reasoning extraction.
//!
//! A two-state machine (`Outside`, `InsideReasoning`) fed with text as it
//! arrives. Reasoning text is buffered until its closing marker shows up
//! and then emitted once, trimmed; narrative text is forwarded as soon as
//! it cannot be the start of an opening marker.
//!
//! One extractor serves exactly one stream. Create a new one (or call
//! [`ThinkExtractor::reset`]) per response.
//!
//! # Example
//!
//! ```rust,ignore
//! use ollachat::reasoning::{ThinkEvent, ThinkExtractor};
//!
//! let mut extractor = ThinkExtractor::new();
//! assert!(extractor.push("<think>par").is_empty());
//! assert_eq!(
//!     extractor.push("t1</think>visible"),
//!     vec![
//!         ThinkEvent::Reasoning("part1".into()),
//!         ThinkEvent::Narrative("visible".into()),
//!     ]
//! );
//! ```

use super::{TagConfig, partial_tag_start};

/// Default cap on buffered, unterminated reasoning text.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 1024 * 1024;

/// Output of the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThinkEvent {
    /// Text outside any reasoning block.
    Narrative(String),
    /// The trimmed inner text of one reasoning block.
    Reasoning(String),
}

impl ThinkEvent {
    pub fn text(&self) -> &str {
        match self {
            Self::Narrative(text) | Self::Reasoning(text) => text,
        }
    }

    pub const fn is_reasoning(&self) -> bool {
        matches!(self, Self::Reasoning(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractorState {
    Outside,
    InsideReasoning,
}

/// Per-stream reasoning extractor.
#[derive(Debug, Clone)]
pub struct ThinkExtractor {
    config: TagConfig,
    state: ExtractorState,
    /// Reasoning text received since the opening marker
    buffer: String,
    /// Possible start of an opening marker, held back while outside
    held: String,
    /// Whether part of the current block was already flushed on overflow
    flushed: bool,
    max_buffer_bytes: usize,
    overflows: usize,
}

impl Default for ThinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkExtractor {
    pub fn new() -> Self {
        Self::with_config(TagConfig::think())
    }

    pub fn with_config(config: TagConfig) -> Self {
        Self {
            config,
            state: ExtractorState::Outside,
            buffer: String::new(),
            held: String::new(),
            flushed: false,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            overflows: 0,
        }
    }

    /// Cap the unterminated reasoning buffer at `bytes`.
    pub fn with_max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = bytes.max(1);
        self
    }

    /// Whether a reasoning block is currently open.
    pub fn is_inside_reasoning(&self) -> bool {
        self.state == ExtractorState::InsideReasoning
    }

    /// Bytes of reasoning text currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// How many times the buffer cap was hit.
    pub const fn overflow_count(&self) -> usize {
        self.overflows
    }

    /// Process the next piece of streamed text.
    pub fn push(&mut self, text: &str) -> Vec<ThinkEvent> {
        let mut events = Vec::new();
        let mut input = std::mem::take(&mut self.held);
        input.push_str(text);

        loop {
            match self.state {
                ExtractorState::Outside => {
                    let open = self.config.opening_tag.as_str();
                    if let Some(idx) = input.find(open) {
                        push_narrative(&mut events, &input[..idx]);
                        input = input.split_off(idx + open.len());
                        self.state = ExtractorState::InsideReasoning;
                        self.buffer.clear();
                        self.flushed = false;
                        continue;
                    }

                    match partial_tag_start(&input, open) {
                        Some(idx) => {
                            self.held = input.split_off(idx);
                            push_narrative(&mut events, &input);
                        }
                        None => push_narrative(&mut events, &input),
                    }
                    break;
                }
                ExtractorState::InsideReasoning => {
                    self.buffer.push_str(&input);
                    input.clear();

                    let close = self.config.closing_tag.as_str();
                    if let Some(idx) = self.buffer.find(close) {
                        let rest = self.buffer.split_off(idx + close.len());
                        self.buffer.truncate(idx);
                        let inner = self.buffer.trim();
                        if !(self.flushed && inner.is_empty()) {
                            events.push(ThinkEvent::Reasoning(inner.to_string()));
                        }
                        self.buffer.clear();
                        self.flushed = false;
                        self.state = ExtractorState::Outside;
                        input = rest;
                        continue;
                    }

                    if self.buffer.len() > self.max_buffer_bytes {
                        self.flush_overflow(&mut events);
                    }
                    break;
                }
            }
        }

        events
    }

    /// End of stream. An open block is closed and emitted as reasoning; a
    /// held-back partial marker is emitted as narrative. Resets the extractor.
    pub fn finish(&mut self) -> Vec<ThinkEvent> {
        let mut events = Vec::new();
        match self.state {
            ExtractorState::Outside => {
                let held = std::mem::take(&mut self.held);
                push_narrative(&mut events, &held);
            }
            ExtractorState::InsideReasoning => {
                let inner = self.buffer.trim();
                if !(self.flushed && inner.is_empty()) {
                    tracing::debug!(
                        buffered = self.buffer.len(),
                        "Closing unterminated reasoning block at end of stream"
                    );
                    events.push(ThinkEvent::Reasoning(inner.to_string()));
                }
            }
        }
        self.reset();
        events
    }

    /// Discard all state, e.g. when the stream was cancelled.
    pub fn reset(&mut self) {
        self.state = ExtractorState::Outside;
        self.buffer.clear();
        self.held.clear();
        self.flushed = false;
    }

    fn flush_overflow(&mut self, events: &mut Vec<ThinkEvent>) {
        self.overflows += 1;
        tracing::warn!(
            buffered = self.buffer.len(),
            limit = self.max_buffer_bytes,
            "Unterminated reasoning block exceeded buffer limit; flushing"
        );

        // keep a possible partial closing marker for the next chunk
        let keep = partial_tag_start(&self.buffer, &self.config.closing_tag)
            .map(|idx| self.buffer.split_off(idx))
            .unwrap_or_default();
        let flushed = std::mem::replace(&mut self.buffer, keep);
        let trimmed = flushed.trim();
        if !trimmed.is_empty() {
            events.push(ThinkEvent::Reasoning(trimmed.to_string()));
        }
        self.flushed = true;
    }
}

fn push_narrative(events: &mut Vec<ThinkEvent>, text: &str) {
    if !text.is_empty() {
        events.push(ThinkEvent::Narrative(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrative(events: &[ThinkEvent]) -> String {
        events
            .iter()
            .filter(|e| !e.is_reasoning())
            .map(ThinkEvent::text)
            .collect()
    }

    fn reasoning(events: &[ThinkEvent]) -> Vec<String> {
        events
            .iter()
            .filter(|e| e.is_reasoning())
            .map(|e| e.text().to_string())
            .collect()
    }

    fn run(chunks: &[&str]) -> Vec<ThinkEvent> {
        let mut extractor = ThinkExtractor::new();
        let mut events: Vec<ThinkEvent> = chunks.iter().flat_map(|c| extractor.push(c)).collect();
        events.extend(extractor.finish());
        events
    }

    #[test]
    fn test_block_across_chunk_boundary() {
        let mut extractor = ThinkExtractor::new();
        assert!(extractor.push("<think>par").is_empty());
        assert!(extractor.is_inside_reasoning());
        let events = extractor.push("t1</think>visible");
        assert_eq!(
            events,
            vec![
                ThinkEvent::Reasoning("part1".into()),
                ThinkEvent::Narrative("visible".into()),
            ]
        );
        assert!(!extractor.is_inside_reasoning());
        assert_eq!(extractor.buffered_len(), 0);
    }

    #[test]
    fn test_plain_text_passes_through() {
        let events = run(&["Hello", " world"]);
        assert_eq!(narrative(&events), "Hello world");
        assert!(reasoning(&events).is_empty());
    }

    #[test]
    fn test_text_before_and_after_block() {
        let events = run(&["Intro <think> a", "b </think> answer"]);
        assert_eq!(reasoning(&events), vec!["ab"]);
        assert_eq!(narrative(&events), "Intro  answer");
    }

    #[test]
    fn test_multiple_blocks_emit_separately() {
        let events = run(&["<think>one</think>A<think>two</think>B"]);
        assert_eq!(
            events,
            vec![
                ThinkEvent::Reasoning("one".into()),
                ThinkEvent::Narrative("A".into()),
                ThinkEvent::Reasoning("two".into()),
                ThinkEvent::Narrative("B".into()),
            ]
        );
    }

    #[test]
    fn test_markers_split_across_chunks() {
        let events = run(&["Hi <thi", "nk>secret</th", "ink> there"]);
        assert_eq!(reasoning(&events), vec!["secret"]);
        assert_eq!(narrative(&events), "Hi  there");
        assert!(!narrative(&events).contains('<'));
    }

    #[test]
    fn test_false_partial_marker_released() {
        let events = run(&["a <", "b"]);
        assert_eq!(narrative(&events), "a <b");
    }

    #[test]
    fn test_held_partial_marker_flushed_at_finish() {
        let mut extractor = ThinkExtractor::new();
        assert_eq!(extractor.push("x <th"), vec![ThinkEvent::Narrative("x ".into())]);
        assert_eq!(extractor.finish(), vec![ThinkEvent::Narrative("<th".into())]);
    }

    #[test]
    fn test_unterminated_block_closed_at_finish() {
        let mut extractor = ThinkExtractor::new();
        assert!(extractor.push("<think> still thinking").is_empty());
        assert_eq!(
            extractor.finish(),
            vec![ThinkEvent::Reasoning("still thinking".into())]
        );
        assert!(!extractor.is_inside_reasoning());
    }

    #[test]
    fn test_empty_block_still_emits() {
        let events = run(&["<think></think>done"]);
        assert_eq!(
            events,
            vec![
                ThinkEvent::Reasoning(String::new()),
                ThinkEvent::Narrative("done".into()),
            ]
        );
    }

    #[test]
    fn test_overflow_flushes_as_reasoning() {
        let mut extractor = ThinkExtractor::new().with_max_buffer_bytes(8);
        let mut events = extractor.push("<think>0123456789</th");
        assert_eq!(events, vec![ThinkEvent::Reasoning("0123456789".into())]);
        assert_eq!(extractor.overflow_count(), 1);
        assert!(extractor.is_inside_reasoning());

        events = extractor.push("ink>after");
        assert_eq!(events, vec![ThinkEvent::Narrative("after".into())]);
    }

    #[test]
    fn test_reset_discards_partial_state() {
        let mut extractor = ThinkExtractor::new();
        extractor.push("<think>abandoned");
        extractor.reset();
        assert_eq!(extractor.push("fresh"), vec![ThinkEvent::Narrative("fresh".into())]);
    }

    #[test]
    fn test_custom_tags() {
        let mut extractor = ThinkExtractor::with_config(TagConfig::new("<thought>", "</thought>"));
        let events = extractor.push("<thought>hmm</thought>ok <think>x</think>");
        assert_eq!(
            events,
            vec![
                ThinkEvent::Reasoning("hmm".into()),
                ThinkEvent::Narrative("ok <think>x</think>".into()),
            ]
        );
    }
}
