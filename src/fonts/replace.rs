//! Font replacement: text in selected fonts is removed from the page and
//! written again with a standard font.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use lopdf::{dictionary, Object};
use serde::{Deserialize, Serialize};

use super::inventory::{font_names, FontMapping};
use super::metrics::{encode_win_ansi, StandardFont};
use crate::backend::{ContentOp, LopdfBackend, PdfBackend, PdfValue};
use crate::content::{scan_text, strip_text, FontFilter, TextSpan};
use crate::error::{Error, Result};
use crate::geometry::Matrix;
use crate::maintenance::combine_page_contents;
use crate::pages::{PageGeometry, PageSelection};

/// Old font names mapped to standard replacement fonts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontReplacer {
    table: BTreeMap<String, StandardFont>,
}

impl FontReplacer {
    /// Build the lookup table; `keep` entries are skipped.
    pub fn from_mappings(mappings: &[FontMapping]) -> Result<Self> {
        let mut table = BTreeMap::new();
        for mapping in mappings.iter().filter(|m| !m.is_keep()) {
            let font = StandardFont::from_name(&mapping.newfont).ok_or_else(|| {
                Error::Mapping(format!(
                    "'{}' is not a standard font (use e.g. Helvetica, Times-Roman, Courier or helv, tiro, cour)",
                    mapping.newfont.trim()
                ))
            })?;
            for old in &mapping.oldfont {
                table.insert(old.clone(), font);
            }
        }
        Ok(Self { table })
    }

    /// Add a single replacement.
    pub fn with(mut self, old: impl Into<String>, new: StandardFont) -> Self {
        self.table.insert(old.into(), new);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Replacement for a font name.
    ///
    /// Font names may be truncated by producers, so when there is no exact
    /// entry, names where one is a prefix of the other match too. Such
    /// near matches must agree on a single replacement.
    pub fn lookup(&self, old: &str) -> Result<Option<StandardFont>> {
        if let Some(font) = self.table.get(old) {
            return Ok(Some(*font));
        }
        let candidates: BTreeSet<StandardFont> = self
            .table
            .iter()
            .filter(|(name, _)| name.starts_with(old) || old.starts_with(name.as_str()))
            .map(|(_, font)| *font)
            .collect();
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.into_iter().next()),
            _ => Err(Error::Mapping(format!(
                "'{}' matches several replacement fonts: {}",
                old,
                candidates
                    .iter()
                    .map(|f| f.base_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Replacement for any of a font's name variants.
    fn lookup_any(&self, names: &[String]) -> Result<Option<StandardFont>> {
        for name in names {
            if let Some(font) = self.lookup(name)? {
                return Ok(Some(font));
            }
        }
        Ok(None)
    }
}

/// Font replacement settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceOptions {
    pub pages: PageSelection,
    /// Reduce the font size when the new font makes text wider than before
    pub shrink_to_fit: bool,
    /// Prefix of the resource names given to the new fonts
    pub resource_prefix: String,
}

impl ReplaceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_shrink_to_fit(mut self, shrink: bool) -> Self {
        self.shrink_to_fit = shrink;
        self
    }
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            pages: PageSelection::All,
            shrink_to_fit: true,
            resource_prefix: "RF".to_string(),
        }
    }
}

/// What a replacement run changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaceReport {
    /// Pages whose content was rewritten
    pub pages: Vec<u32>,
    /// Text spans written with a new font
    pub spans: usize,
    /// Text-showing operators removed
    pub removed: usize,
    /// Base names of the fonts that were added
    pub fonts: Vec<String>,
}

/// Replace fonts in the selected pages.
pub fn replace_fonts(
    backend: &mut LopdfBackend,
    replacer: &FontReplacer,
    options: &ReplaceOptions,
) -> Result<ReplaceReport> {
    let mut report = ReplaceReport::default();
    let mut added: BTreeSet<&'static str> = BTreeSet::new();
    for number in options.pages.resolve(backend.page_count())? {
        let page = backend.page_id(number)?;

        // resource name -> replacement font
        let mut targets: HashMap<Vec<u8>, StandardFont> = HashMap::new();
        {
            let doc = backend.raw_doc();
            let fonts = doc
                .get_page_fonts(page)
                .map_err(|e| Error::Font(format!("page {}: {}", number, e)))?;
            for (name, font) in fonts {
                let (_, names) = font_names(doc, font);
                if let Some(new) = replacer.lookup_any(&names)? {
                    targets.insert(name, new);
                }
            }
        }
        if targets.is_empty() {
            continue;
        }

        combine_page_contents(backend, page)?;
        let geometry = backend.page_geometry(number)?;
        let spans = scan_text(&*backend, number)?;
        let ops = backend.decode_content(&backend.page_content(page)?)?;
        let stripped = strip_text(&ops, &FontFilter::fonts(targets.keys()))?;

        let mut content = Vec::with_capacity(stripped.content.len() + 2);
        content.push(ContentOp::new("q", vec![]));
        content.extend(stripped.content);
        content.push(ContentOp::new("Q", vec![]));

        let mut used: BTreeSet<StandardFont> = BTreeSet::new();
        let mut rewritten = 0;
        for span in spans.iter().filter(|s| !s.text.trim().is_empty()) {
            let Some(new) = targets.get(span.font_ref.as_bytes()) else {
                continue;
            };
            let resource = resource_name(&options.resource_prefix, *new);
            content.extend(reinsert_ops(span, *new, &resource, &geometry, options.shrink_to_fit));
            used.insert(*new);
            rewritten += 1;
        }

        for font in &used {
            let mut dict = dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_name(),
            };
            if !font.is_symbolic() {
                dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
            }
            let id = backend.raw_doc_mut().add_object(dict);
            let resource = resource_name(&options.resource_prefix, *font);
            backend.set_page_resource(page, b"Font", resource.as_bytes(), Object::Reference(id))?;
            added.insert(font.base_name());
        }

        backend.set_page_content(page, &content)?;
        log::debug!(
            "Page {}: removed {} text operator(s), rewrote {} span(s)",
            number,
            stripped.removed,
            rewritten
        );
        report.spans += rewritten;
        report.removed += stripped.removed;
        report.pages.push(number);
    }
    report.fonts = added.into_iter().map(str::to_string).collect();
    Ok(report)
}

fn resource_name(prefix: &str, font: StandardFont) -> String {
    format!("{}{}", prefix, font.short_name())
}

/// Operators writing a span again with `font`.
fn reinsert_ops(
    span: &TextSpan,
    font: StandardFont,
    resource: &str,
    geometry: &PageGeometry,
    shrink: bool,
) -> Vec<ContentOp> {
    let mut size = span.size;
    let length = font.text_length(&span.text, size);
    if shrink && length > span.bbox.width() && length > 0.0 {
        size *= span.bbox.width() / length;
    }

    // upright text in page coordinates, expressed in PDF user space
    let inverse = geometry.inverse_matrix();
    let linear = Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, 0.0).concat(&Matrix {
        e: 0.0,
        f: 0.0,
        ..inverse
    });
    let origin = span.origin.transform(&inverse);
    let tm = Matrix {
        e: origin.x,
        f: origin.y,
        ..linear
    };

    let mut ops = vec![
        ContentOp::new("BT", vec![]),
        ContentOp::new("Tf", vec![PdfValue::name(resource.as_bytes()), PdfValue::real(size)]),
        ContentOp::new(
            "rg",
            vec![
                PdfValue::real(span.color.r),
                PdfValue::real(span.color.g),
                PdfValue::real(span.color.b),
            ],
        ),
    ];
    ops.push(ContentOp::new(
        "Tm",
        tm.to_array().into_iter().map(PdfValue::real).collect(),
    ));
    ops.push(ContentOp::new("Tj", vec![PdfValue::Str(encode_win_ansi(&span.text))]));
    ops.push(ContentOp::new("ET", vec![]));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Color;
    use crate::geometry::{Point, Rect};

    fn mapping(old: &[&str], new: &str) -> FontMapping {
        FontMapping {
            oldfont: old.iter().map(|s| s.to_string()).collect(),
            newfont: new.to_string(),
            info: String::new(),
        }
    }

    #[test]
    fn test_lookup_exact_and_near_matches() {
        let replacer = FontReplacer::from_mappings(&[
            mapping(&["ArialMT", "Arial"], "helv"),
            mapping(&["Georgia"], "keep"),
            mapping(&["TimesNewRomanPS-BoldMT"], "Times-Bold"),
        ])
        .unwrap();

        assert_eq!(replacer.lookup("Arial").unwrap(), Some(StandardFont::Helvetica));
        assert_eq!(replacer.lookup("Georgia").unwrap(), None);
        assert_eq!(
            replacer.lookup("TimesNewRomanPS-Bold").unwrap(),
            Some(StandardFont::TimesBold)
        );
        assert_eq!(
            replacer.lookup("ArialMT,Bold").unwrap(),
            Some(StandardFont::Helvetica)
        );
    }

    #[test]
    fn test_ambiguous_near_match() {
        let replacer = FontReplacer::default()
            .with("FooSans-Regular", StandardFont::Helvetica)
            .with("FooSans-Bold", StandardFont::HelveticaBold);
        assert!(matches!(replacer.lookup("FooSans"), Err(Error::Mapping(_))));
    }

    #[test]
    fn test_unknown_replacement_font() {
        let err = FontReplacer::from_mappings(&[mapping(&["Arial"], "Comic Sans")]).unwrap_err();
        assert!(matches!(err, Error::Mapping(_)));
    }

    #[test]
    fn test_reinsert_shrinks_wide_text() {
        let span = TextSpan {
            text: "Hello".to_string(),
            font: "Narrow".to_string(),
            font_ref: "F1".to_string(),
            size: 10.0,
            color: Color::rgb(1.0, 0.0, 0.0),
            origin: Point::new(72.0, 100.0),
            bbox: Rect::new(72.0, 92.0, 92.0, 102.0),
            chars: Vec::new(),
            page: 1,
            seqno: 0,
        };
        let ops = reinsert_ops(&span, StandardFont::Courier, "RFcour", &PageGeometry::letter(1), true);
        let operators: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(operators, ["BT", "Tf", "rg", "Tm", "Tj", "ET"]);

        // Courier "Hello" is 30pt at size 10, the span is 20pt wide
        let size = ops[1].operands[1].as_number().unwrap();
        assert!((size - 20.0 / 3.0).abs() < 1e-4);
        let tm: Vec<f32> = ops[3].operands.iter().filter_map(PdfValue::as_number).collect();
        assert_eq!(tm, [1.0, 0.0, 0.0, 1.0, 72.0, 692.0]);
    }
}
