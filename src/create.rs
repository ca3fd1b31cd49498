//! Plain text to PDF conversion.

use lopdf::{dictionary, Document, Object, Stream};

use crate::backend::{encode_content, ContentOp, LopdfBackend, PdfValue};
use crate::content::Color;
use crate::error::Result;
use crate::fonts::metrics::encode_win_ansi;
use crate::fonts::StandardFont;
use crate::metadata::{write_metadata, Metadata};

const BODY_FONT: &[u8] = b"F0";
const LABEL_FONT: &[u8] = b"F1";

/// Converts text files into paginated PDFs.
///
/// Pages carry the text in a monospaced font, a header with the file name,
/// rules below the header and above the footer, and a `page (total)`
/// footer. All coordinates below are measured from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct TextToPdf {
    pub page_width: f32,
    pub page_height: f32,
    pub font_size: f32,
    /// Line distance as a multiple of the font size
    pub line_height: f32,
    pub body_font: StandardFont,
    pub left: f32,
    /// Baseline of the first text line
    pub top: f32,
    /// Length of the header and footer rules
    pub rule_width: f32,
    pub header_size: f32,
    pub footer_size: f32,
    pub accent: Color,
    pub author: String,
    pub tab_width: usize,
}

impl Default for TextToPdf {
    fn default() -> Self {
        Self {
            page_width: 595.0,
            page_height: 842.0,
            font_size: 10.0,
            line_height: 1.2,
            body_font: StandardFont::Courier,
            left: 50.0,
            top: 72.0,
            rule_width: 500.0,
            header_size: 16.0,
            footer_size: 8.0,
            accent: Color::rgb(0.0, 0.0, 1.0),
            author: String::new(),
            tab_width: 8,
        }
    }
}

impl TextToPdf {
    /// A4 pages with 10 point Courier.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, width: f32, height: f32) -> Self {
        self.page_width = width;
        self.page_height = height;
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_body_font(mut self, font: StandardFont) -> Self {
        self.body_font = font;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Text lines fitting on one page.
    pub fn lines_per_page(&self) -> usize {
        let usable = self.page_height - 108.0;
        ((usable / (self.font_size * self.line_height)).floor() as usize).max(1)
    }

    /// Lay out `text` on pages; `name` is shown in the header and the title.
    ///
    /// Empty input still produces one page.
    pub fn convert(&self, text: &str, name: &str) -> Result<LopdfBackend> {
        let lines: Vec<String> = text.lines().map(|l| self.expand_tabs(l)).collect();
        let chunks: Vec<&[String]> = if lines.is_empty() {
            vec![&lines[..]]
        } else {
            lines.chunks(self.lines_per_page()).collect()
        };
        let total = chunks.len();

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let body = doc.add_object(font_dict(self.body_font));
        let label = doc.add_object(font_dict(StandardFont::Helvetica));
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! {
                BODY_FONT.to_vec() => body,
                LABEL_FONT.to_vec() => label,
            },
        });

        let mut kids = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            let ops = self.page_ops(chunk, name, index + 1, total);
            let content = doc.add_object(Stream::new(dictionary! {}, encode_content(&ops)?));
            let page = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(self.page_width), Object::Real(self.page_height)],
                "Contents" => content,
                "Resources" => resources,
            });
            kids.push(Object::Reference(page));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => total as i64,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);

        let mut backend = LopdfBackend::from_document(doc);
        let mut meta = Metadata {
            title: format!("Content of file {}", name),
            author: self.author.clone(),
            creator: "pdfsmith text2pdf".to_string(),
            producer: format!("pdfsmith {}", crate::VERSION),
            ..Default::default()
        };
        meta.touch();
        write_metadata(&mut backend, &meta, false)?;
        log::debug!(
            "Converted {} line(s) into {} page(s), {} lines per page",
            lines.len(),
            total,
            self.lines_per_page()
        );
        Ok(backend)
    }

    fn expand_tabs(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut column = 0;
        for c in line.chars() {
            if c == '\t' && self.tab_width > 0 {
                let pad = self.tab_width - column % self.tab_width;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            } else {
                out.push(c);
                column += 1;
            }
        }
        out
    }

    fn page_ops(&self, lines: &[String], name: &str, number: usize, total: usize) -> Vec<ContentOp> {
        let h = self.page_height;
        let leading = self.font_size * self.line_height;
        let accent = [self.accent.r, self.accent.g, self.accent.b].map(PdfValue::real);
        let mut ops = Vec::new();

        // body
        ops.push(ContentOp::new("BT", vec![]));
        ops.push(ContentOp::new(
            "Tf",
            vec![PdfValue::name(BODY_FONT), PdfValue::real(self.font_size)],
        ));
        ops.push(ContentOp::new("TL", vec![PdfValue::real(leading)]));
        ops.push(ContentOp::new(
            "Td",
            vec![PdfValue::real(self.left), PdfValue::real(h - self.top)],
        ));
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push(ContentOp::new("T*", vec![]));
            }
            ops.push(ContentOp::new("Tj", vec![PdfValue::Str(encode_win_ansi(line))]));
        }
        ops.push(ContentOp::new("ET", vec![]));

        // header, footer and rules
        let footer = format!("{} ({})", number, total);
        let footer_x =
            self.left + self.rule_width - StandardFont::Helvetica.text_length(&footer, self.footer_size);
        ops.push(ContentOp::new("q", vec![]));
        ops.push(ContentOp::new("rg", accent.to_vec()));
        ops.push(ContentOp::new("RG", accent.to_vec()));
        ops.extend(label_ops(name, self.left, h - 50.0, self.header_size));
        ops.extend(label_ops(&footer, footer_x, 33.0 - self.footer_size * 1.2, self.footer_size));
        ops.push(ContentOp::new("w", vec![PdfValue::real(0.5)]));
        for y in [h - 60.0, 33.0] {
            ops.push(ContentOp::new("m", vec![PdfValue::real(self.left), PdfValue::real(y)]));
            ops.push(ContentOp::new(
                "l",
                vec![PdfValue::real(self.left + self.rule_width), PdfValue::real(y)],
            ));
            ops.push(ContentOp::new("S", vec![]));
        }
        ops.push(ContentOp::new("Q", vec![]));
        ops
    }
}

fn label_ops(text: &str, x: f32, y: f32, size: f32) -> Vec<ContentOp> {
    vec![
        ContentOp::new("BT", vec![]),
        ContentOp::new("Tf", vec![PdfValue::name(LABEL_FONT), PdfValue::real(size)]),
        ContentOp::new("Td", vec![PdfValue::real(x), PdfValue::real(y)]),
        ContentOp::new("Tj", vec![PdfValue::Str(encode_win_ansi(text))]),
        ContentOp::new("ET", vec![]),
    ]
}

fn font_dict(font: StandardFont) -> lopdf::Dictionary {
    let mut dict = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_name(),
    };
    if !font.is_symbolic() {
        dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    }
    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PdfBackend;
    use crate::metadata::read_metadata;
    use crate::text::page_lines;

    #[test]
    fn test_lines_per_page() {
        // (842 - 108) / 12
        assert_eq!(TextToPdf::new().lines_per_page(), 61);
        assert_eq!(TextToPdf::new().with_font_size(12.0).lines_per_page(), 50);
    }

    #[test]
    fn test_expand_tabs() {
        let t = TextToPdf::new();
        assert_eq!(t.expand_tabs("a\tb"), "a       b");
        assert_eq!(t.expand_tabs("\tx"), "        x");
    }

    #[test]
    fn test_convert_paginates() {
        let text: String = (1..=130).map(|i| format!("line {}\n", i)).collect();
        let backend = TextToPdf::new().convert(&text, "notes.txt").unwrap();
        assert_eq!(backend.page_count(), 3);

        let lines = page_lines(&backend, 3).unwrap();
        let texts: Vec<String> = lines.iter().map(|l| l.text()).collect();
        assert_eq!(texts.first().map(String::as_str), Some("notes.txt"));
        assert!(texts.contains(&"line 123".to_string()));
        assert_eq!(texts.last().map(String::as_str), Some("3 (3)"));

        let meta = read_metadata(&backend);
        assert_eq!(meta.title, "Content of file notes.txt");
        assert!(meta.created().is_some());
    }

    #[test]
    fn test_convert_empty_text() {
        let backend = TextToPdf::new().convert("", "empty.txt").unwrap();
        assert_eq!(backend.page_count(), 1);
    }
}
