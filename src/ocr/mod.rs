//! OCR fallback for text that cannot be mapped to Unicode.
//!
//! Spans whose text contains U+FFFD are rendered to a grayscale raster by a
//! [`RegionRenderer`] and recognized by an [`OcrEngine`]. Both are external
//! programs by default ([`PdftoppmRenderer`], [`TesseractCli`]); tests and
//! embedders can plug in their own implementations.

mod render;
mod tesseract;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::backend::PdfBackend;
use crate::content::{TextChar, TextSpan};
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::options::LoadOptions;
use crate::text::document_spans;

pub use render::PdftoppmRenderer;
pub use tesseract::TesseractCli;

/// Recognizes the text in a PNG image.
pub trait OcrEngine {
    /// Return the recognized text, without trailing line breaks.
    fn recognize(&self, png: &[u8]) -> Result<String>;
}

/// Renders a rectangle of a page to PNG bytes.
pub trait RegionRenderer {
    /// `clip` is in page coordinates (top-left origin, points).
    fn render_region(&self, page_number: u32, clip: &Rect, dpi: u32, gray: bool) -> Result<Vec<u8>>;
}

impl<T: OcrEngine + ?Sized> OcrEngine for &T {
    fn recognize(&self, png: &[u8]) -> Result<String> {
        (**self).recognize(png)
    }
}

impl<T: RegionRenderer + ?Sized> RegionRenderer for &T {
    fn render_region(&self, page_number: u32, clip: &Rect, dpi: u32, gray: bool) -> Result<Vec<u8>> {
        (**self).render_region(page_number, clip, dpi, gray)
    }
}

/// OCR fallback settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOptions {
    /// Resolution of the rendered span images (288 dpi is a zoom of 4)
    pub dpi: u32,
    /// Text used when rendering or recognition fails
    pub placeholder: String,
}

impl OcrOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            dpi: 288,
            placeholder: "?".to_string(),
        }
    }
}

/// One repaired span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRepair {
    pub page: u32,
    pub bbox: Rect,
    pub before: String,
    pub after: String,
}

/// Counters and timings of an OCR run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrStats {
    /// Number of spans sent to OCR
    pub invocations: usize,
    /// Spans for which the placeholder was used
    pub failures: usize,
    pub render_time: Duration,
    pub ocr_time: Duration,
}

impl OcrStats {
    pub fn average_render_time(&self) -> Duration {
        average(self.render_time, self.invocations)
    }

    pub fn average_ocr_time(&self) -> Duration {
        average(self.ocr_time, self.invocations)
    }
}

fn average(total: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) | Err(_) => Duration::ZERO,
        Ok(n) => total / n,
    }
}

/// Result of running the fallback over a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrReport {
    pub repairs: Vec<OcrRepair>,
    pub stats: OcrStats,
}

/// Replaces unrecognized span text with OCR output.
pub struct OcrFallback<E: OcrEngine, R: RegionRenderer> {
    engine: E,
    renderer: R,
    options: OcrOptions,
    stats: OcrStats,
}

impl<E: OcrEngine, R: RegionRenderer> OcrFallback<E, R> {
    pub fn new(engine: E, renderer: R) -> Self {
        Self {
            engine,
            renderer,
            options: OcrOptions::default(),
            stats: OcrStats::default(),
        }
    }

    pub fn with_options(mut self, options: OcrOptions) -> Self {
        self.options = options;
        self
    }

    pub fn stats(&self) -> &OcrStats {
        &self.stats
    }

    /// Repair every span containing U+FFFD, in place.
    ///
    /// Leading and trailing whitespace of a span is kept around the
    /// recognized text; character boxes are spread evenly over the span.
    /// Failures never abort: they are logged and the placeholder is used.
    pub fn repair_spans(&mut self, spans: &mut [TextSpan]) -> Vec<OcrRepair> {
        let mut repairs = Vec::new();
        for span in spans.iter_mut().filter(|s| s.has_unknown_glyphs()) {
            let recognized = self.recognize_span(span.page, &span.bbox);
            let before = std::mem::take(&mut span.text);
            let after = splice(&before, &recognized);
            log::debug!("OCR page {}: '{}' -> '{}'", span.page, before, after);
            span.chars = spread_chars(&after, &span.bbox, span.origin.y);
            span.text = after.clone();
            repairs.push(OcrRepair {
                page: span.page,
                bbox: span.bbox,
                before,
                after,
            });
        }
        repairs
    }

    /// Scan the selected pages and repair their spans.
    pub fn repair_document<B: PdfBackend + ?Sized>(
        &mut self,
        backend: &B,
        options: &LoadOptions,
    ) -> Result<OcrReport> {
        let mut repairs = Vec::new();
        for (_, mut spans) in document_spans(backend, options)? {
            repairs.extend(self.repair_spans(&mut spans));
        }
        Ok(OcrReport {
            repairs,
            stats: self.stats,
        })
    }

    fn recognize_span(&mut self, page: u32, bbox: &Rect) -> String {
        self.stats.invocations += 1;
        let result = self.render_and_recognize(page, bbox);
        match result {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                log::warn!("OCR returned no text for {:?} on page {}", bbox, page);
                self.stats.failures += 1;
                self.options.placeholder.clone()
            }
            Err(e) => {
                log::warn!("OCR failed for {:?} on page {}: {}", bbox, page, e);
                self.stats.failures += 1;
                self.options.placeholder.clone()
            }
        }
    }

    fn render_and_recognize(&mut self, page: u32, bbox: &Rect) -> Result<String> {
        let started = Instant::now();
        let png = self.renderer.render_region(page, bbox, self.options.dpi, true);
        let rendered = Instant::now();
        self.stats.render_time += rendered - started;
        let text = self.engine.recognize(&png?);
        self.stats.ocr_time += rendered.elapsed();
        text
    }
}

/// Put `recognized` between the blanks surrounding `original`.
fn splice(original: &str, recognized: &str) -> String {
    let trimmed_start = original.trim_start();
    let leading = &original[..original.len() - trimmed_start.len()];
    let trailing = &trimmed_start[trimmed_start.trim_end().len()..];
    format!("{}{}{}", leading, recognized.trim(), trailing)
}

fn spread_chars(text: &str, bbox: &Rect, baseline: f32) -> Vec<TextChar> {
    let count = text.chars().count();
    if count == 0 {
        return Vec::new();
    }
    let step = bbox.width() / count as f32;
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            let x0 = bbox.x0 + step * i as f32;
            TextChar {
                c,
                origin: Point::new(x0, baseline),
                bbox: Rect::new(x0, bbox.y0, x0 + step, bbox.y1),
            }
        })
        .collect()
}

/// Error for a failed external program.
pub(crate) fn tool_error(tool: &std::path::Path, message: impl Into<String>) -> Error {
    Error::ExternalTool {
        tool: tool.display().to_string(),
        message: message.into(),
    }
}
