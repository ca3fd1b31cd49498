//! Embedded files (document-level attachments).

use std::collections::HashSet;

use lopdf::{Dictionary, Object};
use serde::{Deserialize, Serialize};

use crate::backend::{dict_get, dict_get_dict, dict_get_number, object_text, stream_bytes, LopdfBackend};
use crate::error::{Error, Result};
use crate::names::collect_name_tree;

/// One entry of the `/EmbeddedFiles` name tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedFile {
    /// Key in the name tree
    pub name: String,
    /// File name from the file specification (`/UF`, else `/F`)
    pub filename: String,
    pub description: String,
    /// Uncompressed length
    pub length: u64,
    /// Stored (possibly compressed) size
    pub size: u64,
}

/// Sums over a list of embedded files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedTotals {
    pub count: usize,
    pub length: u64,
    pub size: u64,
}

impl EmbeddedTotals {
    pub fn of(files: &[EmbeddedFile]) -> Self {
        files.iter().fold(Self::default(), |acc, f| Self {
            count: acc.count + 1,
            length: acc.length + f.length,
            size: acc.size + f.size,
        })
    }

    /// Stored size relative to the uncompressed length (1 when empty).
    pub fn ratio(&self) -> f64 {
        if self.length == 0 {
            1.0
        } else {
            self.size as f64 / self.length as f64
        }
    }

    /// Fraction saved by compression.
    pub fn savings(&self) -> f64 {
        1.0 - self.ratio()
    }
}

fn file_specs(backend: &LopdfBackend) -> Result<Vec<(String, &Dictionary)>> {
    let doc = backend.raw_doc();
    let catalog = backend.catalog()?;
    let tree = dict_get_dict(doc, catalog, b"Names").and_then(|n| dict_get_dict(doc, n, b"EmbeddedFiles"));
    let Some(tree) = tree else {
        return Ok(Vec::new());
    };
    let mut leaves = Vec::new();
    let mut visited = HashSet::new();
    collect_name_tree(backend, tree, 0, &mut visited, &mut leaves);
    Ok(leaves
        .into_iter()
        .filter_map(|(name, spec)| match crate::backend::resolve(doc, spec) {
            Object::Dictionary(d) => Some((name, d)),
            _ => None,
        })
        .collect())
}

fn file_stream<'a>(backend: &'a LopdfBackend, spec: &'a Dictionary) -> Option<&'a lopdf::Stream> {
    let doc = backend.raw_doc();
    let ef = dict_get_dict(doc, spec, b"EF")?;
    [b"UF".as_slice(), b"F".as_slice()]
        .iter()
        .find_map(|key| match dict_get(doc, ef, key)? {
            Object::Stream(s) => Some(s),
            _ => None,
        })
}

/// All embedded files, in name tree order.
pub fn list_embedded(backend: &LopdfBackend) -> Result<Vec<EmbeddedFile>> {
    let doc = backend.raw_doc();
    let mut files = Vec::new();
    for (name, spec) in file_specs(backend)? {
        let Some(stream) = file_stream(backend, spec) else {
            log::warn!("Embedded file '{}' has no file stream, skipping", name);
            continue;
        };
        let filename = dict_get(doc, spec, b"UF")
            .or_else(|| dict_get(doc, spec, b"F"))
            .and_then(object_text)
            .unwrap_or_else(|| name.clone());
        let description = dict_get(doc, spec, b"Desc").and_then(object_text).unwrap_or_default();
        let params = dict_get_dict(doc, &stream.dict, b"Params");
        let length = match params.and_then(|p| dict_get_number(doc, p, b"Size")) {
            Some(size) => size as u64,
            None => stream_bytes(stream).map(|b| b.len() as u64).unwrap_or(0),
        };
        files.push(EmbeddedFile {
            name,
            filename,
            description,
            length,
            size: stream.content.len() as u64,
        });
    }
    Ok(files)
}

/// Content of the embedded file stored under `name`.
pub fn extract_embedded(backend: &LopdfBackend, name: &str) -> Result<Vec<u8>> {
    let specs = file_specs(backend)?;
    let (_, spec) = specs
        .into_iter()
        .find(|(key, _)| key == name)
        .ok_or_else(|| Error::ResourceNotFound(format!("embedded file '{}'", name)))?;
    let stream = file_stream(backend, spec)
        .ok_or_else(|| Error::MissingObject(format!("file stream of embedded file '{}'", name)))?;
    stream_bytes(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Stream};

    fn backend_with_attachment() -> LopdfBackend {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => Vec::<Object>::new(), "Count" => 0 }),
        );
        let mut stream = Stream::new(
            dictionary! { "Type" => "EmbeddedFile" },
            b"hello ".repeat(20),
        );
        stream.compress().unwrap();
        let file = doc.add_object(stream);
        let spec = doc.add_object(dictionary! {
            "Type" => "Filespec",
            "F" => Object::string_literal("greeting.txt"),
            "Desc" => Object::string_literal("A greeting"),
            "EF" => dictionary! { "F" => file },
        });
        let tree = doc.add_object(dictionary! {
            "Names" => vec![Object::string_literal("greeting"), spec.into()],
        });
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Names" => dictionary! { "EmbeddedFiles" => tree },
        });
        doc.trailer.set("Root", catalog);
        LopdfBackend::from_document(doc)
    }

    #[test]
    fn test_list_embedded() {
        let files = list_embedded(&backend_with_attachment()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "greeting");
        assert_eq!(files[0].filename, "greeting.txt");
        assert_eq!(files[0].description, "A greeting");
        assert_eq!(files[0].length, 120);

        let totals = EmbeddedTotals::of(&files);
        assert_eq!(totals.count, 1);
        assert!(totals.ratio() > 0.0 && totals.ratio() < 1.0);
    }

    #[test]
    fn test_extract_embedded() {
        let backend = backend_with_attachment();
        assert_eq!(extract_embedded(&backend, "greeting").unwrap(), b"hello ".repeat(20));
        assert!(matches!(
            extract_embedded(&backend, "missing"),
            Err(Error::ResourceNotFound(_))
        ));
    }
}
