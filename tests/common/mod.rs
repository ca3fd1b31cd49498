//! Synthetic PDFs for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pdfsmith::LopdfBackend;

/// Builds letter-sized documents page by page.
///
/// Every page can use `F1` (Helvetica) and `F2` (a subset of Georgia,
/// not embedded).
pub struct TestPdf {
    doc: Document,
    pages_id: ObjectId,
    resources: ObjectId,
    kids: Vec<Object>,
}

impl TestPdf {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let helv = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let georgia = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "ABCDEF+Georgia",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => helv, "F2" => georgia },
        });
        Self {
            doc,
            pages_id,
            resources,
            kids: Vec::new(),
        }
    }

    /// Add a page with the given content stream.
    pub fn page(self, content: &str) -> Self {
        self.rotated_page(content, 0)
    }

    pub fn rotated_page(self, content: &str, rotate: i64) -> Self {
        self.raw_page(content.as_bytes(), rotate)
    }

    /// Add a page whose content stream may hold binary data.
    pub fn raw_page(mut self, content: &[u8], rotate: i64) -> Self {
        let contents = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Rotate" => rotate,
            "Contents" => contents,
            "Resources" => self.resources,
        });
        self.kids.push(page.into());
        self
    }

    pub fn build(mut self) -> LopdfBackend {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog);
        LopdfBackend::from_document(self.doc)
    }

    /// Build and write the document to `dir/name`.
    pub fn save(self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        self.build().save(&path).unwrap();
        path
    }
}

/// `BT /F1 <size> Tf <x> <y> Td (<text>) Tj ET` with PDF coordinates.
pub fn text_at(text: &str, x: f32, y: f32, size: f32) -> String {
    format!("BT /F1 {} Tf {} {} Td ({}) Tj ET\n", size, x, y, text)
}
