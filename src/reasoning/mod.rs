//! Reasoning block handling.
//!
//! Thinking models interleave a `<think>...</think>` block with their
//! answer. This module separates the two, either incrementally while a
//! response streams in ([`ThinkExtractor`]) or over a complete text
//! ([`split_segments`]).

pub mod extractor;
pub mod segments;

pub use extractor::{ThinkEvent, ThinkExtractor};
pub use segments::{Segment, SegmentKind, reassemble, split_segments, strip_reasoning};

/// Opening marker of a reasoning block.
pub const THINK_OPEN: &str = "<think>";
/// Closing marker of a reasoning block.
pub const THINK_CLOSE: &str = "</think>";

/// Tag pair delimiting a reasoning block.
///
/// Markers are matched literally and case-sensitively.
///
/// # Example
///
/// ```rust,ignore
/// use ollachat::reasoning::TagConfig;
///
/// let config = TagConfig::new("<thought>", "</thought>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConfig {
    /// Opening tag (e.g., "<think>")
    pub opening_tag: String,
    /// Closing tag (e.g., "</think>")
    pub closing_tag: String,
}

impl TagConfig {
    pub fn new(opening_tag: impl Into<String>, closing_tag: impl Into<String>) -> Self {
        Self {
            opening_tag: opening_tag.into(),
            closing_tag: closing_tag.into(),
        }
    }

    /// `<think>...</think>`, as emitted by DeepSeek-R1, Qwen and similar models.
    pub fn think() -> Self {
        Self::new(THINK_OPEN, THINK_CLOSE)
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        Self::think()
    }
}

/// Start of the longest suffix of `text` that is a proper prefix of `tag`.
///
/// Handles tags split across chunks: `"Hello <thi"` against `"<think>"`
/// yields `Some(6)`.
pub(crate) fn partial_tag_start(text: &str, tag: &str) -> Option<usize> {
    if tag.is_empty() {
        return None;
    }

    text.char_indices()
        .map(|(i, _)| i)
        .filter(|&i| text.len() - i < tag.len())
        .find(|&i| tag.starts_with(&text[i..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_tag_start() {
        assert_eq!(partial_tag_start("Hello <thi", "<think>"), Some(6));
        assert_eq!(partial_tag_start("Hello <", "<think>"), Some(6));
        assert_eq!(partial_tag_start("Hello", "<think>"), None);
        assert_eq!(partial_tag_start("", "<think>"), None);
        assert_eq!(partial_tag_start("abc", ""), None);
    }

    #[test]
    fn test_partial_tag_start_ignores_complete_tag() {
        // complete matches are found with `find`, not here
        assert_eq!(partial_tag_start("x<think>", "<think>"), None);
    }

    #[test]
    fn test_partial_tag_start_multibyte() {
        assert_eq!(partial_tag_start("héllo ü</th", "</think>"), Some(9));
    }
}
