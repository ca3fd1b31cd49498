//! # pdfsmith
//!
//! PDF recipes for Rust: content stream scanning, text and drawing
//! extraction, figure detection, OCR fallback for unreadable text, font
//! replacement and page surgery.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfsmith::{graphics, text};
//!
//! fn main() -> pdfsmith::Result<()> {
//!     let doc = pdfsmith::open("document.pdf")?;
//!
//!     // Words and lines of the first page, in reading order
//!     for line in text::page_lines(&doc, 1)? {
//!         println!("{}", line.text());
//!     }
//!
//!     // Areas covered by vector graphics
//!     let regions = graphics::page_regions(&doc, 1, &graphics::RegionOptions::neighborhood())?;
//!     println!("{} figure(s)", regions.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Content streams**: graphics-state tracking, paths, text spans with
//!   per-character boxes, removal of text by font
//! - **Text**: words, lines, clipped text, search, keyword lookup, tables
//! - **Graphics**: rectangle joining, figure regions, table grid lines
//! - **OCR fallback**: spans with undecodable glyphs re-read from a raster
//! - **Fonts**: inventory, mapping files and replacement by standard fonts
//! - **Document parts**: outline, named destinations, metadata, form
//!   fields, embedded files and images
//! - **Page surgery**: derotation, content combination, annotation removal,
//!   page selection
//! - **Parallel processing**: Uses Rayon for path extraction on many pages

pub mod backend;
pub mod content;
pub mod create;
pub mod detect;
pub mod embedded;
pub mod error;
pub mod fonts;
pub mod forms;
pub mod geometry;
pub mod graphics;
pub mod images;
pub mod maintenance;
pub mod metadata;
pub mod names;
pub mod ocr;
pub mod options;
pub mod outline;
pub mod output;
pub mod pages;
pub mod text;

// Re-export commonly used types
pub use backend::{LopdfBackend, PdfBackend};
pub use content::{Color, DrawPath, TextSpan};
pub use create::TextToPdf;
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use error::{Error, Result};
pub use geometry::{Matrix, Point, Rect};
pub use metadata::Metadata;
pub use options::{ErrorMode, LoadOptions};
pub use outline::TocEntry;
pub use output::{to_json, JsonFormat};
pub use pages::{PageGeometry, PageSelection};

use std::path::Path;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open a PDF file.
///
/// The header is checked first, so that non-PDF input fails with
/// [`Error::UnknownFormat`] instead of a parser error.
///
/// # Example
///
/// ```no_run
/// use pdfsmith::PdfBackend;
///
/// let doc = pdfsmith::open("document.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn open<P: AsRef<Path>>(path: P) -> Result<LopdfBackend> {
    open_with_options(path, &LoadOptions::default())
}

/// Open a PDF file, decrypting it with [`LoadOptions::password`].
///
/// # Example
///
/// ```no_run
/// use pdfsmith::{open_with_options, LoadOptions};
///
/// let options = LoadOptions::new().with_password("secret");
/// let doc = open_with_options("encrypted.pdf", &options).unwrap();
/// ```
pub fn open_with_options<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<LopdfBackend> {
    let path = path.as_ref();
    let format = detect_format_from_path(path)?;
    log::debug!("Opening {} ({})", path.display(), format);
    let backend = LopdfBackend::load_file(path)?;
    unlock(backend, options)
}

/// Open a PDF held in memory.
pub fn open_bytes(data: &[u8], options: &LoadOptions) -> Result<LopdfBackend> {
    detect_format_from_bytes(data)?;
    let backend = LopdfBackend::load_bytes(data)?;
    unlock(backend, options)
}

fn unlock(mut backend: LopdfBackend, options: &LoadOptions) -> Result<LopdfBackend> {
    if backend.is_encrypted() {
        match &options.password {
            Some(password) => backend.decrypt(password)?,
            None => log::warn!("Document is encrypted and no password was given"),
        }
    }
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_bytes_empty_data() {
        let data: [u8; 0] = [];
        assert!(matches!(
            open_bytes(&data, &LoadOptions::default()),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_open_bytes_unknown_magic() {
        let data = b"<!DOCTYPE html><html></html>";
        assert!(matches!(
            open_bytes(data, &LoadOptions::default()),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_open_bytes_truncated_pdf() {
        let data = b"%PDF-1.7\n%test";
        assert!(open_bytes(data, &LoadOptions::default()).is_err());
    }

    #[test]
    fn test_open_bytes_roundtrip() {
        let mut doc = TextToPdf::new().convert("hello\nworld\n", "hello.txt").unwrap();
        let bytes = doc.save_to_bytes().unwrap();
        let reopened = open_bytes(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(reopened.page_count(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(open("does/not/exist.pdf"), Err(Error::Io(_))));
    }
}
