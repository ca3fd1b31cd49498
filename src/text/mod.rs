//! Page text: spans, words, lines, clipped plain text, search and tables.

pub mod search;
pub mod table;
pub mod words;

use crate::backend::PdfBackend;
use crate::content::{scan_text, TextSpan};
use crate::error::Result;
use crate::geometry::Rect;
use crate::options::LoadOptions;

pub use search::{lookup_keywords, search_for, KeywordQuery, KeywordValue};
pub use table::{grid_table, parse_table, Table, TableOptions};
pub use words::{group_lines, is_continuation, sort_words, words_from_spans, ClipMode, TextLine, Word};

/// Text spans of one page, in content stream order.
pub fn page_spans<B: PdfBackend + ?Sized>(backend: &B, page_number: u32) -> Result<Vec<TextSpan>> {
    scan_text(backend, page_number)
}

/// Words of one page, in content stream order.
pub fn page_words<B: PdfBackend + ?Sized>(backend: &B, page_number: u32) -> Result<Vec<Word>> {
    Ok(words_from_spans(&page_spans(backend, page_number)?))
}

/// Lines of one page, top to bottom.
pub fn page_lines<B: PdfBackend + ?Sized>(backend: &B, page_number: u32) -> Result<Vec<TextLine>> {
    Ok(group_lines(page_words(backend, page_number)?))
}

/// Plain text of one page, one line per text line.
///
/// With a clip only the words selected by `mode` are kept.
pub fn page_text<B: PdfBackend + ?Sized>(
    backend: &B,
    page_number: u32,
    clip: Option<Rect>,
    mode: ClipMode,
) -> Result<String> {
    let mut words = page_words(backend, page_number)?;
    if let Some(clip) = clip {
        words.retain(|w| mode.selects(&clip, &w.bbox));
    }
    Ok(lines_to_text(&group_lines(words)))
}

/// Join line texts with newlines.
pub fn lines_to_text(lines: &[TextLine]) -> String {
    lines
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Spans of a page selection, in page order.
///
/// Glyph decoding needs the document's font objects, so pages are scanned
/// one after the other.
pub fn document_spans<B: PdfBackend + ?Sized>(
    backend: &B,
    options: &LoadOptions,
) -> Result<Vec<(u32, Vec<TextSpan>)>> {
    let numbers = options.pages.resolve(backend.page_count())?;
    let mut pages = Vec::with_capacity(numbers.len());
    for number in numbers {
        let spans = page_spans(backend, number);
        if let Some(spans) = options
            .error_mode
            .handle(format_args!("page {}", number), spans)?
        {
            log::debug!("Scanned {} span(s) on page {}", spans.len(), number);
            pages.push((number, spans));
        }
    }
    Ok(pages)
}
