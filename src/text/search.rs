//! Text search and keyword lookup.

use serde::{Deserialize, Serialize};

use super::words::{is_continuation, sort_words, Word};
use crate::content::TextSpan;
use crate::geometry::Rect;

/// A searchable character: lowercased, with its box (`None` for the
/// separators inserted between spans that are apart on a line).
struct SearchChar {
    c: char,
    bbox: Option<Rect>,
}

/// Case-insensitive search; returns one rectangle per hit.
///
/// Runs of whitespace match any run of whitespace. Hits do not cross lines.
pub fn search_for(spans: &[TextSpan], needle: &str) -> Vec<Rect> {
    let needle = normalize(needle.chars());
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for line in line_chars(spans) {
        let mut start = 0;
        while start + needle.len() <= line.len() {
            let window = &line[start..start + needle.len()];
            if window.iter().zip(&needle).all(|(h, n)| h.c == *n) {
                if let Some(r) = window
                    .iter()
                    .filter_map(|h| h.bbox)
                    .reduce(|a, b| a.union(&b))
                {
                    hits.push(r);
                }
                start += needle.len();
            } else {
                start += 1;
            }
        }
    }
    hits
}

fn normalize(chars: impl Iterator<Item = char>) -> Vec<char> {
    let mut out: Vec<char> = Vec::new();
    for c in chars.flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            if out.last().is_some_and(|l| *l != ' ') {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
    if out.last() == Some(&' ') {
        out.pop();
    }
    out
}

/// Characters of each visual line, spans ordered left to right.
fn line_chars(spans: &[TextSpan]) -> Vec<Vec<SearchChar>> {
    let mut ordered: Vec<&TextSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| {
        a.bbox
            .y1
            .round()
            .total_cmp(&b.bbox.y1.round())
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut lines: Vec<Vec<SearchChar>> = Vec::new();
    let mut last: Option<&TextSpan> = None;
    for span in ordered {
        let same_line = last.is_some_and(|l| l.bbox.y1.round() == span.bbox.y1.round());
        if !same_line {
            lines.push(Vec::new());
        }
        let Some(line) = lines.last_mut() else {
            continue;
        };
        let joined = last.is_some_and(|l| is_continuation(l, span));
        if same_line && !joined && line.last().is_some_and(|c| c.c != ' ') {
            line.push(SearchChar { c: ' ', bbox: None });
        }
        for ch in &span.chars {
            for c in ch.c.to_lowercase() {
                if c.is_whitespace() {
                    if line.last().is_some_and(|l| l.c != ' ') {
                        line.push(SearchChar { c: ' ', bbox: None });
                    }
                } else {
                    line.push(SearchChar {
                        c,
                        bbox: Some(ch.bbox),
                    });
                }
            }
        }
        last = Some(span);
    }
    lines
}

/// What to look up: the word `offset` positions after `keyword`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordQuery {
    pub keyword: String,
    pub offset: usize,
}

impl KeywordQuery {
    pub fn new(keyword: impl Into<String>, offset: usize) -> Self {
        Self {
            keyword: keyword.into(),
            offset,
        }
    }

    /// Parse `KEY` or `KEY:+N` (default offset 1).
    pub fn parse(spec: &str) -> Self {
        match spec.rsplit_once(":+") {
            Some((key, n)) if !key.is_empty() => match n.parse() {
                Ok(offset) => Self::new(key, offset),
                Err(_) => Self::new(spec, 1),
            },
            _ => Self::new(spec, 1),
        }
    }
}

/// The value found for a keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordValue {
    pub keyword: String,
    pub value: Option<String>,
}

/// Look up values that follow keywords in reading order.
///
/// Words are sorted by bottom then left coordinate, so a value may also sit
/// on the next line as long as no other text comes in between. The first
/// occurrence of each keyword wins.
pub fn lookup_keywords(words: &[Word], queries: &[KeywordQuery]) -> Vec<KeywordValue> {
    let mut sorted = words.to_vec();
    sort_words(&mut sorted);
    queries
        .iter()
        .map(|q| KeywordValue {
            keyword: q.keyword.clone(),
            value: sorted
                .iter()
                .position(|w| w.text == q.keyword)
                .and_then(|i| sorted.get(i + q.offset))
                .map(|w| w.text.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Color, TextChar};
    use crate::geometry::Point;
    use crate::text::words::words_from_spans;

    fn span_at(text: &str, x: f32, y: f32) -> TextSpan {
        let chars: Vec<TextChar> = text
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f32 * 5.0;
                TextChar {
                    c,
                    origin: Point::new(x0, y),
                    bbox: Rect::new(x0, y - 8.0, x0 + 5.0, y + 2.0),
                }
            })
            .collect();
        TextSpan {
            text: text.to_string(),
            font: "Helvetica".to_string(),
            font_ref: "F1".to_string(),
            size: 10.0,
            color: Color::BLACK,
            origin: Point::new(x, y),
            bbox: Rect::new(x, y - 8.0, x + 5.0 * text.chars().count() as f32, y + 2.0),
            chars,
            page: 1,
            seqno: 0,
        }
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let spans = vec![span_at("Total amount  due", 100.0, 200.0)];
        let hits = search_for(&spans, "AMOUNT due");
        assert_eq!(hits, vec![Rect::new(130.0, 192.0, 185.0, 202.0)]);
        assert!(search_for(&spans, "missing").is_empty());
        assert!(search_for(&spans, "  ").is_empty());
    }

    #[test]
    fn test_search_across_spans_on_one_line() {
        let spans = vec![span_at("stark", 10.0, 50.0), span_at("aus.", 50.0, 50.0)];
        let hits = search_for(&spans, "stark aus.");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].x0, 10.0);
        assert_eq!(hits[0].x1, 70.0);
    }

    #[test]
    fn test_search_word_split_over_spans() {
        let spans = vec![
            span_at("Hel", 10.0, 50.0),
            span_at("lo", 25.0, 50.0),
            span_at(" world", 35.0, 50.0),
        ];
        let hits = search_for(&spans, "hello world");
        assert_eq!(hits, vec![Rect::new(10.0, 42.0, 65.0, 52.0)]);
        assert_eq!(search_for(&spans, "hello").len(), 1);
    }

    #[test]
    fn test_multiple_hits() {
        let spans = vec![span_at("abab", 0.0, 10.0), span_at("ab", 0.0, 30.0)];
        assert_eq!(search_for(&spans, "ab").len(), 3);
    }

    #[test]
    fn test_lookup_keywords() {
        let spans = vec![
            span_at("INVOICE # 4711", 10.0, 20.0),
            span_at("DATE: 2024-05-01", 200.0, 20.0),
            span_at("BALANCE DUE", 10.0, 300.0),
            span_at("$12.00", 10.0, 320.0),
        ];
        let words = words_from_spans(&spans);
        let values = lookup_keywords(
            &words,
            &[
                KeywordQuery::parse("DATE:"),
                KeywordQuery::parse("INVOICE:+2"),
                KeywordQuery::parse("BALANCE:+2"),
                KeywordQuery::parse("Tax"),
            ],
        );
        let found: Vec<Option<&str>> = values.iter().map(|v| v.value.as_deref()).collect();
        assert_eq!(
            found,
            [Some("2024-05-01"), Some("4711"), Some("$12.00"), None]
        );
    }

    #[test]
    fn test_keyword_query_parse() {
        assert_eq!(KeywordQuery::parse("Subtotal"), KeywordQuery::new("Subtotal", 1));
        assert_eq!(KeywordQuery::parse("INVOICE:+2"), KeywordQuery::new("INVOICE", 2));
        assert_eq!(KeywordQuery::parse("a:+x"), KeywordQuery::new("a:+x", 1));
    }
}
