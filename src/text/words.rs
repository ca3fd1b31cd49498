//! Words and lines built from text spans.

use serde::{Deserialize, Serialize};

use crate::content::{TextChar, TextSpan};
use crate::geometry::Rect;

/// A whitespace-delimited word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub bbox: Rect,
    /// Index of the span holding the first character
    pub span: usize,
}

/// Words sharing a (rounded) baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub bbox: Rect,
    /// Words sorted left to right
    pub words: Vec<Word>,
}

impl TextLine {
    /// Words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Which words a clip rectangle selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipMode {
    /// The word box lies completely inside the clip
    #[default]
    Contained,
    /// The word box overlaps the clip
    Intersecting,
}

impl ClipMode {
    pub fn selects(self, clip: &Rect, bbox: &Rect) -> bool {
        match self {
            ClipMode::Contained => clip.contains(bbox),
            ClipMode::Intersecting => clip.intersects(bbox) || clip.contains(bbox),
        }
    }
}

/// Largest gap between two spans, as a fraction of the font size, that
/// still counts as the same word.
const WORD_GAP: f32 = 0.15;

/// Largest baseline difference, as a fraction of the font size, for spans
/// on the same line.
const BASELINE_TOLERANCE: f32 = 0.2;

/// Whether `next` continues `prev` on its line without a word gap.
///
/// Producers often split a word over several `Tj`/`TJ` operators or change
/// the font inside it; such spans are joined by their geometry.
pub fn is_continuation(prev: &TextSpan, next: &TextSpan) -> bool {
    let (Some(last), Some(first)) = (prev.chars.last(), next.chars.first()) else {
        return false;
    };
    let size = prev.size.max(next.size).max(1.0);
    let gap = first.bbox.x0 - last.bbox.x1;
    (last.origin.y - first.origin.y).abs() <= size * BASELINE_TOLERANCE && gap.abs() <= size * WORD_GAP
}

/// Split spans into words, in span order.
///
/// A word may run over consecutive spans (see [`is_continuation`]); it is
/// attributed to the span of its first character.
pub fn words_from_spans(spans: &[TextSpan]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Vec<&TextChar> = Vec::new();
    let mut first_span = 0;
    for (index, span) in spans.iter().enumerate() {
        let joined = index > 0 && is_continuation(&spans[index - 1], span);
        if !joined && !current.is_empty() {
            words.push(make_word(&current, first_span));
            current.clear();
        }
        for ch in &span.chars {
            if ch.c.is_whitespace() {
                if !current.is_empty() {
                    words.push(make_word(&current, first_span));
                    current.clear();
                }
            } else {
                if current.is_empty() {
                    first_span = index;
                }
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        words.push(make_word(&current, first_span));
    }
    words
}

fn make_word(chars: &[&TextChar], span: usize) -> Word {
    let bbox = chars
        .iter()
        .map(|c| c.bbox)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();
    Word {
        text: chars.iter().map(|c| c.c).collect(),
        bbox,
        span,
    }
}

/// Sort words top to bottom, then left to right (by rounded bottom edge).
pub fn sort_words(words: &mut [Word]) {
    words.sort_by(|a, b| {
        a.bbox
            .y1
            .round()
            .total_cmp(&b.bbox.y1.round())
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
}

/// Group words into lines by their rounded bottom coordinate.
pub fn group_lines(mut words: Vec<Word>) -> Vec<TextLine> {
    sort_words(&mut words);
    let mut lines: Vec<TextLine> = Vec::new();
    for word in words {
        match lines.last_mut() {
            Some(line) if line.bbox.y1.round() == word.bbox.y1.round() => {
                line.bbox = line.bbox.union(&word.bbox);
                line.words.push(word);
            }
            _ => lines.push(TextLine {
                bbox: word.bbox,
                words: vec![word],
            }),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Color;
    use crate::geometry::Point;

    fn span_at(text: &str, x: f32, y: f32) -> TextSpan {
        // 10pt monospace-like layout: every char 6pt wide, bbox 10pt tall
        let chars: Vec<TextChar> = text
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f32 * 6.0;
                TextChar {
                    c,
                    origin: Point::new(x0, y),
                    bbox: Rect::new(x0, y - 8.0, x0 + 6.0, y + 2.0),
                }
            })
            .collect();
        let bbox = chars
            .iter()
            .map(|c| c.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        TextSpan {
            text: text.to_string(),
            font: "Courier".to_string(),
            font_ref: "F1".to_string(),
            size: 10.0,
            color: Color::BLACK,
            origin: Point::new(x, y),
            bbox,
            chars,
            page: 1,
            seqno: 0,
        }
    }

    #[test]
    fn test_words_split_on_whitespace() {
        let spans = vec![span_at("  Hello  world ", 10.0, 100.0)];
        let words = words_from_spans(&spans);
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["Hello", "world"]);
        assert_eq!(words[0].bbox, Rect::new(22.0, 92.0, 52.0, 102.0));
    }

    #[test]
    fn test_words_run_over_adjacent_spans() {
        // "Hel" ends at x=28, "lo" starts there; " world" starts a new word
        let spans = vec![
            span_at("Hel", 10.0, 100.0),
            span_at("lo", 28.0, 100.0),
            span_at(" world", 40.0, 100.0),
            span_at("far", 200.0, 100.0),
        ];
        let words = words_from_spans(&spans);
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["Hello", "world", "far"]);
        assert_eq!(words[0].span, 0);
        assert_eq!(words[0].bbox, Rect::new(10.0, 92.0, 40.0, 102.0));
        assert_eq!(words[1].span, 2);
        assert!(!is_continuation(&spans[2], &spans[3]));
    }

    #[test]
    fn test_group_lines() {
        let spans = vec![
            span_at("second line", 10.0, 120.0),
            span_at("right", 200.0, 100.2),
            span_at("left", 10.0, 100.0),
        ];
        let lines = group_lines(words_from_spans(&spans));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "left right");
        assert_eq!(lines[1].text(), "second line");
    }

    #[test]
    fn test_clip_modes() {
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        let half_in = Rect::new(90.0, 10.0, 110.0, 20.0);
        assert!(!ClipMode::Contained.selects(&clip, &half_in));
        assert!(ClipMode::Intersecting.selects(&clip, &half_in));
    }
}
