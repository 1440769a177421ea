//! Stream Aggregator
//!
//! Appends the payload of each decoded record to a transcript, strictly in
//! arrival order, until a record carrying `done` is seen. Records that arrive
//! afterwards are drained without effect.

use crate::types::StreamRecord;

/// What happened to a record passed to [`StreamAggregator::accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
    /// Content appended; the stream continues.
    Appended,
    /// Content appended and the record marked the end of the stream.
    Finished,
    /// The stream had already finished; the record was ignored.
    Drained,
}

type ContentSink<'a> = Box<dyn FnMut(&str) + Send + 'a>;

/// Accumulates record content for a single stream.
pub struct StreamAggregator<'a> {
    transcript: String,
    done: bool,
    records_seen: usize,
    drained: usize,
    sink: Option<ContentSink<'a>>,
}

impl std::fmt::Debug for StreamAggregator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamAggregator")
            .field("transcript_len", &self.transcript.len())
            .field("done", &self.done)
            .field("records_seen", &self.records_seen)
            .field("drained", &self.drained)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for StreamAggregator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> StreamAggregator<'a> {
    pub fn new() -> Self {
        Self {
            transcript: String::new(),
            done: false,
            records_seen: 0,
            drained: 0,
            sink: None,
        }
    }

    /// Also forward every appended fragment to `sink`, e.g. the last assistant message.
    pub fn with_sink(mut self, sink: impl FnMut(&str) + Send + 'a) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Append one record's content.
    pub fn accept<R: StreamRecord>(&mut self, record: &R) -> Accepted {
        if self.done {
            self.drained += 1;
            tracing::debug!(drained = self.drained, "Record after stream end drained");
            return Accepted::Drained;
        }

        self.records_seen += 1;
        let content = record.content();
        self.transcript.push_str(content);
        if let Some(sink) = self.sink.as_mut() {
            sink(content);
        }

        if record.is_done() {
            self.done = true;
            Accepted::Finished
        } else {
            Accepted::Appended
        }
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn into_transcript(self) -> String {
        self.transcript
    }

    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Records appended so far (drained ones excluded).
    pub const fn records_seen(&self) -> usize {
        self.records_seen
    }

    pub const fn drained(&self) -> usize {
        self.drained
    }
}
