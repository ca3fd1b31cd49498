//! Font inventory and the editable font mapping file.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object};
use serde::{Deserialize, Serialize};

use crate::backend::{dict_get, dict_get_dict, dict_get_name, dict_get_number, resolve, LopdfBackend, PdfBackend};
use crate::error::{Error, Result};

/// Descriptor flag bits (PDF 32000-1, table 123).
const FLAG_FIXED_PITCH: u32 = 1;
const FLAG_SERIF: u32 = 1 << 1;
const FLAG_ITALIC: u32 = 1 << 6;
const FLAG_FORCE_BOLD: u32 = 1 << 18;

/// A font used somewhere in the document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontRecord {
    /// Name variants: the base font without subset tag, then descendant names
    pub names: Vec<String>,
    pub subtype: String,
    pub subset: bool,
    pub embedded: bool,
    /// Human readable summary of the font program and descriptor flags
    pub info: String,
}

/// One entry of the font mapping file.
///
/// `newfont` is `"keep"` or the name of a standard font.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontMapping {
    pub oldfont: Vec<String>,
    pub newfont: String,
    #[serde(default)]
    pub info: String,
}

impl FontMapping {
    pub const KEEP: &'static str = "keep";

    pub fn keep(record: &FontRecord) -> Self {
        Self {
            oldfont: record.names.clone(),
            newfont: Self::KEEP.to_string(),
            info: record.info.clone(),
        }
    }

    pub fn is_keep(&self) -> bool {
        let newfont = self.newfont.trim();
        newfont.is_empty() || newfont == Self::KEEP
    }
}

/// All distinct fonts of the document, sorted by name.
pub fn font_inventory(backend: &LopdfBackend) -> Result<Vec<FontRecord>> {
    let doc = backend.raw_doc();
    let mut seen: BTreeMap<Vec<String>, FontRecord> = BTreeMap::new();
    for (number, page) in backend.pages() {
        let fonts = doc
            .get_page_fonts(page)
            .map_err(|e| Error::Font(format!("page {}: {}", number, e)))?;
        for font in fonts.values() {
            let record = font_record(doc, font);
            seen.entry(record.names.clone()).or_insert(record);
        }
    }
    log::debug!("Found {} distinct font(s)", seen.len());
    Ok(seen.into_values().collect())
}

/// Describe one font dictionary.
pub(crate) fn font_record(doc: &LopdfDocument, font: &Dictionary) -> FontRecord {
    let (subset, names) = font_names(doc, font);
    let subtype = dict_get_name(doc, font, b"Subtype").unwrap_or_default();
    let descriptor = font_descriptor(doc, font);
    let program = descriptor.and_then(|d| font_program(doc, d));

    let mut info: Vec<String> = Vec::new();
    match &program {
        Some((kind, size)) => info.push(format!("{} program, size {}", kind, size)),
        None => info.push("Not embedded!".to_string()),
    }
    if let Some(d) = descriptor {
        let flags = dict_get_number(doc, d, b"Flags").unwrap_or(0.0) as u32;
        let weight = dict_get_number(doc, d, b"FontWeight").unwrap_or(400.0);
        if flags & FLAG_FIXED_PITCH != 0 {
            info.push("mono".to_string());
        }
        if flags & FLAG_SERIF != 0 {
            info.push("serifed".to_string());
        }
        if flags & FLAG_ITALIC != 0 {
            info.push("italic".to_string());
        }
        if flags & FLAG_FORCE_BOLD != 0 || weight >= 700.0 {
            info.push("bold".to_string());
        }
    }
    if subset {
        info.push("subset font".to_string());
    }

    FontRecord {
        names,
        subtype,
        subset,
        embedded: program.is_some(),
        info: info.join(", "),
    }
}

/// Name variants of a font and whether it is a subset.
pub(crate) fn font_names(doc: &LopdfDocument, font: &Dictionary) -> (bool, Vec<String>) {
    let base = dict_get_name(doc, font, b"BaseFont").unwrap_or_else(|| "Unknown".to_string());
    let subset = is_subset_name(&base);
    let mut names = vec![normalize_font_name(&base)];
    for descendant in descendants(doc, font) {
        if let Some(name) = dict_get_name(doc, descendant, b"BaseFont") {
            let name = normalize_font_name(&name);
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    (subset, names)
}

fn descendants<'a>(doc: &'a LopdfDocument, font: &'a Dictionary) -> Vec<&'a Dictionary> {
    match dict_get(doc, font, b"DescendantFonts") {
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| match resolve(doc, o) {
                Object::Dictionary(d) => Some(d),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn font_descriptor<'a>(doc: &'a LopdfDocument, font: &'a Dictionary) -> Option<&'a Dictionary> {
    dict_get_dict(doc, font, b"FontDescriptor").or_else(|| {
        descendants(doc, font)
            .into_iter()
            .find_map(|d| dict_get_dict(doc, d, b"FontDescriptor"))
    })
}

/// Kind and byte size of the embedded font program.
fn font_program(doc: &LopdfDocument, descriptor: &Dictionary) -> Option<(String, usize)> {
    for key in [&b"FontFile"[..], b"FontFile2", b"FontFile3"] {
        if let Some(Object::Stream(stream)) = dict_get(doc, descriptor, key) {
            let kind = match key {
                b"FontFile" => "Type1".to_string(),
                b"FontFile2" => "TrueType".to_string(),
                _ => dict_get_name(doc, &stream.dict, b"Subtype").unwrap_or_else(|| "CFF".to_string()),
            };
            return Some((kind, stream.content.len()));
        }
    }
    None
}

fn is_subset_name(name: &str) -> bool {
    crate::backend::strip_subset_prefix(name).len() != name.len()
}

/// Decode `#xx` escapes and drop a subset tag.
pub fn normalize_font_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(b);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    let decoded = String::from_utf8_lossy(&decoded).to_string();
    crate::backend::strip_subset_prefix(&decoded).to_string()
}

/// Mapping entries for an inventory, every font set to `keep`.
pub fn default_mapping(records: &[FontRecord]) -> Vec<FontMapping> {
    records.iter().map(FontMapping::keep).collect()
}

/// Write a mapping file as pretty-printed JSON.
pub fn write_mapping<P: AsRef<Path>>(path: P, mappings: &[FontMapping]) -> Result<()> {
    let json = serde_json::to_string_pretty(mappings)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a mapping file.
pub fn read_mapping<P: AsRef<Path>>(path: P) -> Result<Vec<FontMapping>> {
    let data = std::fs::read_to_string(path)?;
    let mappings: Vec<FontMapping> = serde_json::from_str(&data)?;
    for m in &mappings {
        if m.oldfont.is_empty() {
            return Err(Error::Mapping(format!(
                "entry for '{}' has no old font names",
                m.newfont
            )));
        }
    }
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    #[test]
    fn test_normalize_font_name() {
        assert_eq!(normalize_font_name("ABCDEF+Arial#20Bold"), "Arial Bold");
        assert_eq!(normalize_font_name("Helvetica"), "Helvetica");
        assert_eq!(normalize_font_name("Bad#zz"), "Bad#zz");
        assert_eq!(normalize_font_name("Tail#4"), "Tail#4");
    }

    #[test]
    fn test_font_record_of_composite_font() {
        let mut doc = LopdfDocument::with_version("1.7");
        let program = doc.add_object(Stream::new(dictionary! {}, vec![0u8; 1234]));
        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "Flags" => 2 + 64,
            "FontWeight" => 700,
            "FontFile2" => program,
        });
        let cid = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "ABCDEF+NotoSans-Bold",
            "FontDescriptor" => descriptor,
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "ABCDEF+NotoSans-Bold-Identity-H",
            "DescendantFonts" => vec![cid.into()],
        };

        let record = font_record(&doc, &font);
        assert_eq!(record.names, ["NotoSans-Bold-Identity-H", "NotoSans-Bold"]);
        assert!(record.subset);
        assert!(record.embedded);
        assert_eq!(
            record.info,
            "TrueType program, size 1234, serifed, italic, bold, subset font"
        );
    }

    #[test]
    fn test_unembedded_font() {
        let doc = LopdfDocument::with_version("1.7");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        };
        let record = font_record(&doc, &font);
        assert!(!record.embedded);
        assert_eq!(record.info, "Not embedded!");
    }

    #[test]
    fn test_mapping_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fonts.json");
        let mut mappings = vec![FontMapping {
            oldfont: vec!["Arial".into(), "Arial,Bold".into()],
            newfont: "keep".into(),
            info: "Not embedded!".into(),
        }];
        write_mapping(&path, &mappings).unwrap();
        assert_eq!(read_mapping(&path).unwrap(), mappings);

        mappings[0].oldfont.clear();
        write_mapping(&path, &mappings).unwrap();
        assert!(matches!(read_mapping(&path), Err(Error::Mapping(_))));
    }
}
