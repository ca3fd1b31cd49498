//! Integration tests for the font inventory and font replacement.

mod common;

use common::{text_at, TestPdf};
use pdfsmith::fonts::{
    default_mapping, font_inventory, read_mapping, replace_fonts, write_mapping, FontReplacer,
    ReplaceOptions, StandardFont,
};
use pdfsmith::text::page_spans;
use pdfsmith::{Error, PageSelection};

fn two_fonts() -> TestPdf {
    let mut content = text_at("Keep me", 72.0, 700.0, 12.0);
    content.push_str("BT /F2 14 Tf 72 650 Td (Hello world) Tj ET\n");
    TestPdf::new().page(&content).page(&content)
}

#[test]
fn test_font_inventory() {
    let fonts = font_inventory(&two_fonts().build()).unwrap();
    assert_eq!(fonts.len(), 2);
    assert_eq!(fonts[0].names, vec!["Georgia"]);
    assert!(fonts[0].subset);
    assert!(!fonts[0].embedded);
    assert_eq!(fonts[1].names, vec!["Helvetica"]);
}

#[test]
fn test_mapping_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fontnames.json");
    let doc = two_fonts().build();

    let mut mapping = default_mapping(&font_inventory(&doc).unwrap());
    assert!(mapping.iter().all(|m| m.is_keep()));
    assert!(FontReplacer::from_mappings(&mapping).unwrap().is_empty());

    mapping[0].newfont = "tiro".to_string();
    write_mapping(&path, &mapping).unwrap();
    let read = read_mapping(&path).unwrap();
    assert_eq!(read, mapping);

    let replacer = FontReplacer::from_mappings(&read).unwrap();
    assert_eq!(replacer.lookup("Georgia").unwrap(), Some(StandardFont::TimesRoman));
    assert_eq!(replacer.lookup("Helvetica").unwrap(), None);

    mapping[0].newfont = "Comic Sans".to_string();
    assert!(matches!(FontReplacer::from_mappings(&mapping), Err(Error::Mapping(_))));
}

#[test]
fn test_replace_fonts() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = two_fonts().build();
    let replacer = FontReplacer::default().with("Georgia", StandardFont::TimesRoman);
    let options = ReplaceOptions::new().with_pages(PageSelection::Pages(vec![2]));

    let report = replace_fonts(&mut doc, &replacer, &options).unwrap();
    assert_eq!(report.pages, vec![2]);
    assert_eq!(report.spans, 1);
    assert_eq!(report.removed, 1);
    assert_eq!(report.fonts, vec!["Times-Roman"]);

    // save and reopen to check what was written
    let path = dir.path().join("new.pdf");
    doc.save(&path).unwrap();
    let doc = pdfsmith::open(&path).unwrap();

    let spans = page_spans(&doc, 2).unwrap();
    let fonts: Vec<(&str, &str)> = spans.iter().map(|s| (s.text.as_str(), s.font.as_str())).collect();
    assert!(fonts.contains(&("Keep me", "Helvetica")));
    assert!(fonts.contains(&("Hello world", "Times-Roman")));
    assert!(!fonts.iter().any(|(_, font)| *font == "Georgia"));

    // page 1 was not selected
    let untouched = page_spans(&doc, 1).unwrap();
    assert!(untouched.iter().any(|s| s.font == "Georgia"));
}

#[test]
fn test_replace_fonts_keeps_typographic_characters() {
    let content = "BT /F2 12 Tf 72 650 Td (it\\222s \\223ok\\224 \\227 \\200 \\225) Tj ET\n";
    let mut doc = TestPdf::new().page(content).build();
    let expected = "it\u{2019}s \u{201C}ok\u{201D} \u{2014} \u{20AC} \u{2022}";
    assert_eq!(page_spans(&doc, 1).unwrap()[0].text, expected);

    let replacer = FontReplacer::default().with("Georgia", StandardFont::Helvetica);
    replace_fonts(&mut doc, &replacer, &ReplaceOptions::new()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quotes.pdf");
    doc.save(&path).unwrap();
    let spans = page_spans(&pdfsmith::open(&path).unwrap(), 1).unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].font, "Helvetica");
    assert_eq!(spans[0].text, expected);
}
