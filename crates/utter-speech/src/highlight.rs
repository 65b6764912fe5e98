//! Text segmentation for spoken-word highlighting.
//!
//! Pure helpers: a UI layer feeds `Progress` events through [`range_for`]
//! and renders whatever [`segments`] returns. All offsets are char offsets,
//! matching the offsets the controller reports.

use serde::{Deserialize, Serialize};
use utter_core::SpeechEvent;

/// Half-open char range `[start, end)` to highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
}

impl HighlightRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One run of text, highlighted or plain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub highlighted: bool,
}

/// The range a `Progress` event covers; `None` for every other event.
pub const fn range_for(event: &SpeechEvent) -> Option<HighlightRange> {
    match *event {
        SpeechEvent::Progress {
            location, length, ..
        } => Some(HighlightRange::new(location, location + length)),
        _ => None,
    }
}

/// Split `text` into alternating plain and highlighted segments.
///
/// Ranges are sorted by start and clamped to the text. A range overlapping
/// the previous one starts at the previous end; empty ranges are dropped.
pub fn segments(text: &str, highlights: &[HighlightRange]) -> Vec<TextSegment> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let slice = |start: usize, end: usize| chars[start..end].iter().collect::<String>();

    let mut sorted = highlights.to_vec();
    sorted.sort_by_key(|range| range.start);

    let mut parts = Vec::with_capacity(sorted.len() * 2 + 1);
    let mut cursor = 0;
    for range in sorted {
        let start = range.start.clamp(cursor, len);
        let end = range.end.min(len);
        if end <= start {
            continue;
        }
        if start > cursor {
            parts.push(TextSegment {
                text: slice(cursor, start),
                start: cursor,
                end: start,
                highlighted: false,
            });
        }
        parts.push(TextSegment {
            text: slice(start, end),
            start,
            end,
            highlighted: true,
        });
        cursor = end;
    }

    if cursor < len {
        parts.push(TextSegment {
            text: slice(cursor, len),
            start: cursor,
            end: len,
            highlighted: false,
        });
    }
    parts
}
