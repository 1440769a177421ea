//! Record decoding for newline-delimited JSON chunks.
//!
//! A chunk is trimmed, split on `\n`, and every non-empty candidate is
//! decoded on its own. A candidate that fails to parse is skipped and the
//! rest of the chunk is still processed.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Why a candidate line was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not valid JSON.
    InvalidJson(String),
    /// Valid JSON, but `null`, `false`, `0` or `""`.
    Falsy,
    /// Valid JSON that does not match the expected record shape.
    Shape(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(e) => write!(f, "invalid JSON: {e}"),
            Self::Falsy => f.write_str("falsy JSON value"),
            Self::Shape(e) => write!(f, "unexpected record shape: {e}"),
        }
    }
}

/// Result of decoding one candidate line.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome<T> {
    Decoded(T),
    Skipped { line: String, reason: SkipReason },
}

impl<T> DecodeOutcome<T> {
    pub fn into_decoded(self) -> Option<T> {
        match self {
            Self::Decoded(value) => Some(value),
            Self::Skipped { .. } => None,
        }
    }

    pub const fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }
}

/// Tally of one `decode_chunk` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkReport {
    pub decoded: usize,
    pub skipped: usize,
}

impl ChunkReport {
    /// Number of non-empty candidate lines seen.
    pub const fn candidates(&self) -> usize {
        self.decoded + self.skipped
    }

    /// True when the chunk carried no candidates at all.
    pub const fn is_empty(&self) -> bool {
        self.candidates() == 0
    }

    /// True when the chunk had candidates and none of them decoded.
    pub const fn is_total_failure(&self) -> bool {
        self.skipped > 0 && self.decoded == 0
    }

}

/// JavaScript-style falsiness for decoded JSON values.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Decode a single candidate line.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> DecodeOutcome<T> {
    let skipped = |reason| DecodeOutcome::Skipped {
        line: line.to_string(),
        reason,
    };

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return skipped(SkipReason::InvalidJson(e.to_string())),
    };

    if is_falsy(&value) {
        return skipped(SkipReason::Falsy);
    }

    match serde_json::from_value(value) {
        Ok(decoded) => DecodeOutcome::Decoded(decoded),
        Err(e) => skipped(SkipReason::Shape(e.to_string())),
    }
}

/// Decode one candidate line, counting it in `report`.
///
/// Blank candidates are not counted. Skips are logged at warn level.
pub(crate) fn decode_candidate<T: DeserializeOwned>(
    candidate: &str,
    report: &mut ChunkReport,
) -> Option<T> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    match decode_line::<T>(candidate) {
        DecodeOutcome::Decoded(record) => {
            report.decoded += 1;
            Some(record)
        }
        DecodeOutcome::Skipped { line, reason } => {
            report.skipped += 1;
            tracing::warn!(%reason, line = %line, "Skipping malformed JSON record");
            None
        }
    }
}

/// Decode every record in `chunk`, invoking `on_success` once per record in order.
///
/// Empty and whitespace-only chunks are a no-op.
pub fn decode_chunk<T, F>(chunk: &str, mut on_success: F) -> ChunkReport
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    let mut report = ChunkReport::default();

    let trimmed = chunk.trim();
    if trimmed.is_empty() {
        return report;
    }

    for candidate in trimmed.split('\n') {
        if let Some(record) = decode_candidate(candidate, &mut report) {
            on_success(record);
        }
    }

    report
}
