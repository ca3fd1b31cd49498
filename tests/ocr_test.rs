//! Integration tests for the OCR fallback with stand-in engines.

mod common;

use std::cell::RefCell;

use common::{text_at, TestPdf};
use pdfsmith::ocr::{OcrEngine, OcrFallback, OcrOptions, RegionRenderer};
use pdfsmith::{Error, LoadOptions, Rect};

/// Records the requested clips and returns fake image bytes.
#[derive(Default)]
struct RecordingRenderer {
    clips: RefCell<Vec<(u32, Rect, u32)>>,
}

impl RegionRenderer for RecordingRenderer {
    fn render_region(&self, page: u32, clip: &Rect, dpi: u32, _gray: bool) -> pdfsmith::Result<Vec<u8>> {
        self.clips.borrow_mut().push((page, *clip, dpi));
        Ok(vec![0u8; 4])
    }
}

struct FixedEngine(&'static str);

impl OcrEngine for FixedEngine {
    fn recognize(&self, _png: &[u8]) -> pdfsmith::Result<String> {
        Ok(self.0.to_string())
    }
}

struct BrokenEngine;

impl OcrEngine for BrokenEngine {
    fn recognize(&self, _png: &[u8]) -> pdfsmith::Result<String> {
        Err(Error::Ocr("engine not installed".to_string()))
    }
}

fn garbled() -> pdfsmith::LopdfBackend {
    let mut content = text_at("Readable", 72.0, 700.0, 12.0);
    content.push_str("BT /F1 12 Tf 72 650 Td (\\001\\002\\003) Tj ET\n");
    TestPdf::new().page(&content).build()
}

#[test]
fn test_repairs_only_garbled_spans() {
    let doc = garbled();
    let renderer = RecordingRenderer::default();
    let mut fallback =
        OcrFallback::new(FixedEngine("abc"), &renderer).with_options(OcrOptions::new().with_dpi(300));
    let report = fallback.repair_document(&doc, &LoadOptions::default()).unwrap();

    assert_eq!(report.repairs.len(), 1);
    let repair = &report.repairs[0];
    assert_eq!(repair.page, 1);
    assert_eq!(repair.before, "\u{FFFD}\u{FFFD}\u{FFFD}");
    assert_eq!(repair.after, "abc");
    assert_eq!(report.stats.invocations, 1);
    assert_eq!(report.stats.failures, 0);

    let clips = renderer.clips.borrow();
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].0, 1);
    assert_eq!(clips[0].2, 300);
    assert!(clips[0].1.y0 < 142.0 && clips[0].1.y1 > 142.0);
}

#[test]
fn test_failed_recognition_uses_placeholder() {
    let doc = garbled();
    let renderer = RecordingRenderer::default();
    let mut fallback = OcrFallback::new(BrokenEngine, &renderer)
        .with_options(OcrOptions::new().with_placeholder("#"));
    let report = fallback.repair_document(&doc, &LoadOptions::default()).unwrap();

    assert_eq!(report.repairs.len(), 1);
    assert_eq!(report.repairs[0].after, "#");
    assert_eq!(report.stats.failures, 1);
}

#[test]
fn test_clean_document_needs_no_ocr() {
    let doc = TestPdf::new().page(&text_at("All good", 72.0, 700.0, 12.0)).build();
    let renderer = RecordingRenderer::default();
    let mut fallback = OcrFallback::new(FixedEngine("x"), &renderer);
    let report = fallback.repair_document(&doc, &LoadOptions::default()).unwrap();
    assert!(report.repairs.is_empty());
    assert_eq!(fallback.stats().invocations, 0);
    assert!(renderer.clips.borrow().is_empty());
}
