//! Whole-text segmentation into reasoning and narrative spans.

use serde::{Deserialize, Serialize};

use super::{TagConfig, ThinkEvent};

/// Kind of a [`Segment`]; serialized as `"reasoning"` / `"narrative"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Reasoning,
    Narrative,
}

/// A typed span of a complete text, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub text: String,
}

impl Segment {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Reasoning,
            text: text.into(),
        }
    }

    pub fn narrative(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Narrative,
            text: text.into(),
        }
    }

    pub const fn is_reasoning(&self) -> bool {
        matches!(self.kind, SegmentKind::Reasoning)
    }
}

impl From<ThinkEvent> for Segment {
    fn from(event: ThinkEvent) -> Self {
        match event {
            ThinkEvent::Narrative(text) => Self::narrative(text),
            ThinkEvent::Reasoning(text) => Self::reasoning(text),
        }
    }
}

/// Split `text` on `<think>...</think>` blocks.
///
/// Blocks are matched left to right, each opening marker pairing with the
/// first closing marker after it; nesting is not supported. An opening
/// marker without a closing marker runs to the end of the text.
pub fn split_segments(text: &str) -> Vec<Segment> {
    split_segments_with(text, &TagConfig::think())
}

/// [`split_segments`] with custom tags.
pub fn split_segments_with(text: &str, config: &TagConfig) -> Vec<Segment> {
    let open = config.opening_tag.as_str();
    let close = config.closing_tag.as_str();
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open_idx) = rest.find(open) {
        if open_idx > 0 {
            segments.push(Segment::narrative(&rest[..open_idx]));
        }

        let body = &rest[open_idx + open.len()..];
        match body.find(close) {
            Some(close_idx) => {
                segments.push(Segment::reasoning(body[..close_idx].trim()));
                rest = &body[close_idx + close.len()..];
            }
            None => {
                segments.push(Segment::reasoning(body.trim()));
                rest = "";
            }
        }
    }

    if !rest.is_empty() {
        segments.push(Segment::narrative(rest));
    }

    segments
}

/// Rebuild text from segments, wrapping reasoning in `<think>` markers.
pub fn reassemble(segments: &[Segment]) -> String {
    let config = TagConfig::think();
    segments
        .iter()
        .map(|segment| match segment.kind {
            SegmentKind::Narrative => segment.text.clone(),
            SegmentKind::Reasoning => {
                format!("{}{}{}", config.opening_tag, segment.text, config.closing_tag)
            }
        })
        .collect()
}

/// Remove every complete `<think>...</think>` block, leaving unterminated ones in place.
pub fn strip_reasoning(text: &str) -> String {
    let config = TagConfig::think();
    let open = config.opening_tag.as_str();
    let close = config.closing_tag.as_str();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open_idx) = rest.find(open) {
        let body = &rest[open_idx + open.len()..];
        let Some(close_idx) = body.find(close) else {
            break;
        };
        out.push_str(&rest[..open_idx]);
        rest = &body[close_idx + close.len()..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrative_reasoning_narrative() {
        assert_eq!(
            split_segments("A<think>B</think>C"),
            vec![
                Segment::narrative("A"),
                Segment::reasoning("B"),
                Segment::narrative("C"),
            ]
        );
    }

    #[test]
    fn test_unterminated_block_is_closed() {
        let segments = split_segments("A<think>B");
        assert_eq!(segments, vec![Segment::narrative("A"), Segment::reasoning("B")]);
        assert!(segments.iter().all(|s| !s.text.contains("<think>")));
    }

    #[test]
    fn test_unterminated_block_after_complete_one() {
        assert_eq!(
            split_segments("<think>x</think>mid<think> tail "),
            vec![
                Segment::reasoning("x"),
                Segment::narrative("mid"),
                Segment::reasoning("tail"),
            ]
        );
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            split_segments("plain text"),
            vec![Segment::narrative("plain text")]
        );
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_reasoning_is_trimmed_and_no_empty_narrative() {
        assert_eq!(
            split_segments("<think>\n  step one\n</think>"),
            vec![Segment::reasoning("step one")]
        );
    }

    #[test]
    fn test_nested_markers_pair_with_first_close() {
        assert_eq!(
            split_segments("<think>a<think>b</think>c</think>"),
            vec![Segment::reasoning("a<think>b"), Segment::narrative("c</think>")]
        );
    }

    #[test]
    fn test_round_trip_is_stable() {
        for input in [
            "A<think>B</think>C",
            "<think>one</think>two<think>three</think>",
            "no markers at all",
            "lead <think> spaced </think>",
        ] {
            let first = split_segments(input);
            let second = split_segments(&reassemble(&first));
            assert_eq!(first, second, "input: {input}");
        }
    }

    #[test]
    fn test_reassemble_reproduces_trimmed_input() {
        let input = "A<think>B</think>C";
        assert_eq!(reassemble(&split_segments(input)), input);
    }

    #[test]
    fn test_strip_reasoning() {
        assert_eq!(strip_reasoning("a<think>b</think>c<think>d</think>"), "ac");
        assert_eq!(strip_reasoning("a<think>open"), "a<think>open");
        assert_eq!(strip_reasoning("plain"), "plain");
    }

    #[test]
    fn test_segment_serializes_with_type_tag() {
        let value = serde_json::to_value(Segment::reasoning("B")).unwrap();
        assert_eq!(value, serde_json::json!({"type": "reasoning", "text": "B"}));
    }
}
