//! Error types for pdfsmith.

use std::io;
use thiserror::Error;

/// Result type alias for pdfsmith operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading or rewriting PDF documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be processed.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF structure is corrupted or malformed.
    #[error("Corrupted PDF structure: {0}")]
    Corrupted(String),

    /// A required PDF object is missing.
    #[error("Missing required object: {0}")]
    MissingObject(String),

    /// A content stream operator has operands of the wrong count or type.
    #[error("Content stream syntax error at operation {index} ('{operator}'): {message}")]
    ContentSyntax {
        operator: String,
        index: usize,
        message: String,
    },

    /// A `Q` operator was found with no saved graphics state.
    #[error("Unbalanced graphics state restore ('Q') at operation {0}")]
    UnbalancedRestore(usize),

    /// The content stream ended with saved graphics states still on the stack.
    #[error("Content stream ended with {0} unclosed graphics state save(s) ('q')")]
    UnclosedSave(usize),

    /// `BT`/`ET` text objects are nested or left open.
    #[error("Unbalanced text object at operation {0}")]
    UnbalancedText(usize),

    /// Error decoding or selecting fonts.
    #[error("Font error: {0}")]
    Font(String),

    /// The font replacement table is inconsistent.
    #[error("Font mapping error: {0}")]
    Mapping(String),

    /// Error extracting images from PDF.
    #[error("Image extraction error: {0}")]
    ImageExtract(String),

    /// A table could not be laid out on the detected grid.
    #[error("Table layout error: {0}")]
    TableLayout(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Invalid table of contents.
    #[error("Invalid table of contents: {0}")]
    Outline(String),

    /// Malformed line in a delimited (CSV-like) input file.
    #[error("Line {line}: {message}")]
    Delimited { line: usize, message: String },

    /// Resource not found in document.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// An external program (renderer, OCR engine) failed.
    #[error("External tool '{tool}' failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// OCR could not produce text.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error during output rendering.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageExtract(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_content_errors_display() {
        let err = Error::UnbalancedRestore(7);
        assert_eq!(
            err.to_string(),
            "Unbalanced graphics state restore ('Q') at operation 7"
        );

        let err = Error::ContentSyntax {
            operator: "re".to_string(),
            index: 3,
            message: "expected 4 numbers, found 2".to_string(),
        };
        assert!(err.to_string().contains("'re'"));
        assert!(err.to_string().contains("expected 4 numbers"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
