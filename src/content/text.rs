//! Text scanning.
//!
//! Follows the text matrices of a content stream and turns every
//! text-showing operator (`Tj`, `TJ`, `'`, `"`) into a [`TextSpan`] with
//! page-space geometry for the span and each of its characters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::ops;
use super::state::{Color, GraphicsStack};
use crate::backend::{strip_subset_prefix, BackendFontInfo, ContentOp, PageId, PdfBackend, PdfValue};
use crate::error::{Error, Result};
use crate::fonts::metrics::{FontWidths, StandardFont};
use crate::geometry::{Matrix, Point, Rect};
use crate::pages::PageGeometry;

/// Ascender height as a fraction of the font size.
pub const ASCENDER: f32 = 0.8;
/// Descender depth as a fraction of the font size.
pub const DESCENDER: f32 = 0.2;

/// `TJ` displacements beyond this many thousandths of an em read as a space.
const SPACE_THRESHOLD: f32 = 200.0;

/// One character with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChar {
    pub c: char,
    /// Baseline origin
    pub origin: Point,
    pub bbox: Rect,
}

/// Text shown by one operator with one font, size and colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// The text content (NFC normalized)
    pub text: String,
    /// Base font name without subset prefix (e.g., "Helvetica-Bold")
    pub font: String,
    /// Font resource name on the page (e.g., "F1")
    pub font_ref: String,
    /// Effective font size in page units
    pub size: f32,
    /// Fill colour
    pub color: Color,
    /// Baseline origin of the first character
    pub origin: Point,
    pub bbox: Rect,
    pub chars: Vec<TextChar>,
    /// 1-indexed page number
    pub page: u32,
    /// Position of the showing operator in the stream
    pub seqno: usize,
}

impl TextSpan {
    /// Whether the font name suggests a bold face.
    pub fn is_bold(&self) -> bool {
        let lower = self.font.to_lowercase();
        lower.contains("bold") || lower.contains("black") || lower.contains("heavy")
    }

    /// Whether some glyph could not be mapped to Unicode.
    pub fn has_unknown_glyphs(&self) -> bool {
        self.text.contains('\u{FFFD}')
    }
}

/// Fonts of one page with decoding.
struct PageFonts<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    page: PageId,
    fonts: HashMap<Vec<u8>, BackendFontInfo>,
}

impl<B: PdfBackend + ?Sized> PageFonts<'_, B> {
    fn info(&self, name: &[u8]) -> Option<&BackendFontInfo> {
        self.fonts.get(name)
    }
}

/// Text object state: the text matrix and line matrix.
#[derive(Debug, Clone, Copy)]
struct TextObject {
    tm: Matrix,
    tlm: Matrix,
}

impl Default for TextObject {
    fn default() -> Self {
        Self {
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
        }
    }
}

impl TextObject {
    fn set(&mut self, m: Matrix) {
        self.tm = m;
        self.tlm = m;
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).concat(&self.tlm);
        self.tm = self.tlm;
    }

    fn advance(&mut self, tx: f32) {
        self.tm = Matrix::translate(tx, 0.0).concat(&self.tm);
    }
}

/// Scan a page's text spans.
pub fn scan_text<B: PdfBackend + ?Sized>(backend: &B, page_number: u32) -> Result<Vec<TextSpan>> {
    let page = backend.page_id(page_number)?;
    let geometry = backend.page_geometry(page_number)?;
    let content = backend.page_content(page)?;
    let ops = backend.decode_content(&content)?;
    scan_text_ops(backend, page, &geometry, &ops)
}

/// Scan already decoded operations of a page.
pub fn scan_text_ops<B: PdfBackend + ?Sized>(
    backend: &B,
    page: PageId,
    geometry: &PageGeometry,
    content: &[ContentOp],
) -> Result<Vec<TextSpan>> {
    let fonts = PageFonts {
        backend,
        page,
        fonts: backend
            .page_fonts(page)?
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect(),
    };
    let page_matrix = geometry.matrix();
    let mut stack = GraphicsStack::new();
    let mut text_object: Option<TextObject> = None;
    let mut spans = Vec::new();

    for (index, op) in content.iter().enumerate() {
        match op.operator.as_str() {
            "BT" => {
                if text_object.is_some() {
                    return Err(Error::UnbalancedText(index));
                }
                text_object = Some(TextObject::default());
                continue;
            }
            "ET" => {
                if text_object.take().is_none() {
                    return Err(Error::UnbalancedText(index));
                }
                continue;
            }
            _ => {}
        }
        if stack.apply(op, index)? {
            continue;
        }
        let Some(tobj) = text_object.as_mut() else {
            continue;
        };
        let leading = stack.current().text.leading;

        match op.operator.as_str() {
            "Td" => {
                let (tx, ty) = ops::point(op, index)?;
                tobj.translate_line(tx, ty);
            }
            "TD" => {
                let (tx, ty) = ops::point(op, index)?;
                stack.current_mut().text.leading = -ty;
                tobj.translate_line(tx, ty);
            }
            "Tm" => tobj.set(ops::matrix(op, index)?),
            "T*" => tobj.translate_line(0.0, -leading),
            "Tj" => {
                let bytes = ops::string_at(op, index, 0)?;
                let pieces = [TextPiece::Show(bytes)];
                push_span(&mut spans, &fonts, &stack, tobj, &page_matrix, geometry, &pieces, index);
            }
            "TJ" => {
                let Some(PdfValue::Array(items)) = op.operands.first() else {
                    return Err(ops::syntax_error(op, index, "expected an array"));
                };
                let pieces: Vec<TextPiece> = items
                    .iter()
                    .filter_map(|item| match item {
                        PdfValue::Str(s) => Some(TextPiece::Show(s)),
                        other => other.as_number().map(TextPiece::Shift),
                    })
                    .collect();
                push_span(&mut spans, &fonts, &stack, tobj, &page_matrix, geometry, &pieces, index);
            }
            "'" => {
                let bytes = ops::string_at(op, index, 0)?;
                tobj.translate_line(0.0, -leading);
                push_span(
                    &mut spans,
                    &fonts,
                    &stack,
                    tobj,
                    &page_matrix,
                    geometry,
                    &[TextPiece::Show(bytes)],
                    index,
                );
            }
            "\"" => {
                if op.operands.len() != 3 {
                    return Err(ops::syntax_error(op, index, "expected 3 operands"));
                }
                let aw = op.operands[0].as_number();
                let ac = op.operands[1].as_number();
                let (Some(aw), Some(ac)) = (aw, ac) else {
                    return Err(ops::syntax_error(op, index, "expected spacing numbers"));
                };
                let bytes = ops::string_at(op, index, 2)?;
                let text = &mut stack.current_mut().text;
                text.word_spacing = aw;
                text.char_spacing = ac;
                tobj.translate_line(0.0, -leading);
                push_span(
                    &mut spans,
                    &fonts,
                    &stack,
                    tobj,
                    &page_matrix,
                    geometry,
                    &[TextPiece::Show(bytes)],
                    index,
                );
            }
            _ => {}
        }
    }

    if text_object.is_some() {
        return Err(Error::UnbalancedText(content.len()));
    }
    stack.finish()?;
    Ok(spans)
}

enum TextPiece<'a> {
    Show(&'a [u8]),
    /// `TJ` displacement in thousandths of text space
    Shift(f32),
}

#[allow(clippy::too_many_arguments)]
fn push_span<B: PdfBackend + ?Sized>(
    spans: &mut Vec<TextSpan>,
    fonts: &PageFonts<'_, B>,
    stack: &GraphicsStack,
    tobj: &mut TextObject,
    page_matrix: &Matrix,
    geometry: &PageGeometry,
    pieces: &[TextPiece],
    seqno: usize,
) {
    let state = stack.current();
    let ts = &state.text;
    let Some(font_ref) = ts.font.as_deref() else {
        log::debug!("Text shown without a font at operation {}", seqno);
        return;
    };
    let info = fonts.info(font_ref);
    let fallback = FontWidths::Standard(StandardFont::Helvetica);
    let widths = info.map(|f| &f.widths).unwrap_or(&fallback);
    let composite = info.map(|f| f.composite).unwrap_or(false);
    let base_font = info
        .map(|f| strip_subset_prefix(&f.base_font).to_string())
        .unwrap_or_else(|| String::from_utf8_lossy(font_ref).to_string());
    let device = state.ctm.concat(page_matrix);

    let mut chars = Vec::new();
    for piece in pieces {
        match piece {
            TextPiece::Show(bytes) => {
                for glyph in fonts.backend.decode_glyphs(fonts.page, font_ref, bytes) {
                    let w0 = widths.width(glyph.code) / 1000.0;
                    let trm = Matrix::new(
                        ts.size * ts.horizontal_scaling,
                        0.0,
                        0.0,
                        ts.size,
                        0.0,
                        ts.rise,
                    )
                    .concat(&tobj.tm)
                    .concat(&device);
                    let origin = Point::new(0.0, 0.0).transform(&trm);
                    let bbox = Rect::new(0.0, -DESCENDER, w0, ASCENDER).transform(&trm);
                    for c in glyph.text.chars() {
                        chars.push(TextChar { c, origin, bbox });
                    }

                    let word_space = if !composite && glyph.code == 32 {
                        ts.word_spacing
                    } else {
                        0.0
                    };
                    let tx = (w0 * ts.size + ts.char_spacing + word_space) * ts.horizontal_scaling;
                    tobj.advance(tx);
                }
            }
            TextPiece::Shift(n) => {
                let tx = -n / 1000.0 * ts.size * ts.horizontal_scaling;
                if -n > SPACE_THRESHOLD && chars.last().is_some_and(|c: &TextChar| !c.c.is_whitespace()) {
                    let start = Point::new(0.0, 0.0).transform(&tobj.tm.concat(&device));
                    let m = Matrix::new(1.0, 0.0, 0.0, ts.size, 0.0, ts.rise)
                        .concat(&tobj.tm)
                        .concat(&device);
                    let bbox = Rect::new(0.0, -DESCENDER, tx, ASCENDER).transform(&m);
                    chars.push(TextChar {
                        c: ' ',
                        origin: start,
                        bbox,
                    });
                }
                tobj.advance(tx);
            }
        }
    }

    if chars.is_empty() {
        return;
    }
    let bbox = chars
        .iter()
        .map(|c| c.bbox)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();
    let text: String = chars.iter().map(|c| c.c).collect::<String>().nfc().collect();
    let size_matrix = Matrix::scale(ts.size, ts.size).concat(&tobj.tm).concat(&state.ctm);

    spans.push(TextSpan {
        text,
        font: base_font,
        font_ref: String::from_utf8_lossy(font_ref).to_string(),
        size: size_matrix.vertical_scale(),
        color: state.fill_color,
        origin: chars[0].origin,
        bbox,
        chars,
        page: geometry.number,
        seqno,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LopdfBackend;
    use lopdf::{dictionary, Document, Object, Stream};

    fn backend_with(content: &[u8]) -> LopdfBackend {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        LopdfBackend::from_document(doc)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_simple_span_geometry() {
        let backend = backend_with(b"BT /F1 10 Tf 1 0 0 rg 72 700 Td (Hello) Tj ET");
        let spans = scan_text(&backend, 1).unwrap();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.text, "Hello");
        assert_eq!(span.font, "Helvetica");
        assert_eq!(span.font_ref, "F1");
        assert!(approx(span.size, 10.0));
        assert_eq!(span.color, Color::rgb(1.0, 0.0, 0.0));
        assert!(approx(span.origin.x, 72.0));
        assert!(approx(span.origin.y, 92.0));
        // Helvetica "Hello" is 22.78pt wide at 10pt
        assert!(approx(span.bbox.x1, 72.0 + 22.78));
        assert!(approx(span.bbox.y0, 84.0));
        assert!(approx(span.bbox.y1, 94.0));
        assert_eq!(span.chars.len(), 5);
        assert!(approx(span.chars[1].origin.x, 79.22));
    }

    #[test]
    fn test_tj_spacing_inserts_space() {
        let backend = backend_with(b"BT /F1 10 Tf 0 0 Td [(ab) -300 (cd)] TJ ET");
        let spans = scan_text(&backend, 1).unwrap();
        assert_eq!(spans[0].text, "ab cd");
    }

    #[test]
    fn test_leading_and_quote_operators() {
        let backend = backend_with(b"BT /F1 10 Tf 14 TL 100 500 Td (one) Tj (two) ' 2 1 (three) \" ET");
        let spans = scan_text(&backend, 1).unwrap();
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert!(approx(spans[1].origin.y - spans[0].origin.y, 14.0));
        assert!(approx(spans[1].origin.x, 100.0));
        assert!(approx(spans[2].origin.y - spans[1].origin.y, 14.0));
    }

    #[test]
    fn test_text_matrix_scales_size() {
        let backend = backend_with(b"BT /F1 1 Tf 12 0 0 12 50 50 Tm (x) Tj ET");
        let spans = scan_text(&backend, 1).unwrap();
        assert!(approx(spans[0].size, 12.0));
    }

    #[test]
    fn test_nested_text_object_is_error() {
        let backend = backend_with(b"BT BT ET ET");
        assert!(matches!(scan_text(&backend, 1), Err(Error::UnbalancedText(1))));
        let backend = backend_with(b"BT /F1 10 Tf (x) Tj");
        assert!(matches!(scan_text(&backend, 1), Err(Error::UnbalancedText(_))));
    }

    #[test]
    fn test_unknown_font_resource_uses_fallback_metrics() {
        let backend = backend_with(b"BT /F9 10 Tf (abc) Tj ET");
        let spans = scan_text(&backend, 1).unwrap();
        assert_eq!(spans[0].text, "abc");
        assert_eq!(spans[0].font, "F9");
    }
}
