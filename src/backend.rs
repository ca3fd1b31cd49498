//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF access, isolating the concrete
//! PDF library (lopdf) from the scanners in [`crate::content`] and the
//! extraction modules built on top of them.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream, StringFormat};

use crate::error::{Error, Result};
use crate::fonts::metrics::{FontWidths, StandardFont, WEntry};
use crate::geometry::Rect;
use crate::pages::PageGeometry;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Font information returned by the backend.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// Font resource name (key in the page's font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold", "ABCDEF+Calibri").
    pub base_font: String,
    /// Font subtype (e.g., "Type1", "TrueType", "Type0").
    pub subtype: String,
    /// Composite fonts use two-byte character codes.
    pub composite: bool,
    /// Whether a `/ToUnicode` map is present.
    pub has_to_unicode: bool,
    /// Glyph advances.
    pub widths: FontWidths,
}

/// A decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Character code as it appears in the string operand.
    pub code: u32,
    /// Unicode text of the code, U+FFFD when it cannot be decoded.
    pub text: String,
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Bool(bool),
    Null,
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Other,
}

impl PdfValue {
    /// Numeric value of integers and reals.
    pub fn as_number(&self) -> Option<f32> {
        get_number_from_value(self)
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            PdfValue::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn real(v: f32) -> Self {
        PdfValue::Real(v)
    }

    pub fn name(n: &[u8]) -> Self {
        PdfValue::Name(n.to_vec())
    }
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn new(operator: &str, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.to_string(),
            operands,
        }
    }

    /// An inline image kept as its raw `BI ... EI` bytes.
    pub fn inline_image(raw: Vec<u8>) -> Self {
        Self::new("BI", vec![PdfValue::Str(raw)])
    }

    /// Raw bytes of an inline image operation.
    pub fn inline_image_data(&self) -> Option<&[u8]> {
        match (self.operator.as_str(), self.operands.as_slice()) {
            ("BI", [PdfValue::Str(raw)]) => Some(raw.as_slice()),
            _ => None,
        }
    }
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, page geometry, font info,
/// content stream access and text decoding without exposing any concrete
/// PDF library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Number of pages.
    fn page_count(&self) -> u32 {
        self.pages().len() as u32
    }

    /// Resolve a 1-indexed page number.
    fn page_id(&self, number: u32) -> Result<PageId> {
        let pages = self.pages();
        pages
            .get(&number)
            .copied()
            .ok_or(Error::PageOutOfRange(number, pages.len() as u32))
    }

    /// Boxes and rotation of a page.
    fn page_geometry(&self, number: u32) -> Result<PageGeometry>;

    /// Return font info for a given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        decode_content(data)
    }

    /// Split a string operand into character codes and decode each one with
    /// the font's encoding on the given page.
    fn decode_glyphs(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> Vec<Glyph>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        self.decode_glyphs(page, font_name, bytes)
            .into_iter()
            .map(|g| g.text)
            .collect()
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode text as a PDF text string: Latin-1 when possible, else UTF-16BE.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) < 0x80) {
        return text.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Whether decoded text carries no printable character.
fn is_unprintable(text: &str) -> bool {
    text.is_empty() || text.chars().all(|c| c.is_control() || c == '\u{FFFD}')
}

// ---------------------------------------------------------------------------
// Content stream codec
// ---------------------------------------------------------------------------

/// Parse raw content stream bytes into crate-owned operations.
///
/// Inline images are cut out before lopdf sees the stream and come back as
/// one `BI` operation carrying the raw `BI ... EI` bytes, so filtered image
/// data cannot break the parse.
pub fn decode_content(data: &[u8]) -> Result<Vec<ContentOp>> {
    let mut ops = Vec::new();
    for segment in split_inline_images(data)? {
        match segment {
            Segment::Operators(bytes) => {
                if bytes.iter().all(|b| is_whitespace(*b)) {
                    continue;
                }
                let content = Content::decode(bytes).map_err(|e| Error::PdfParse(e.to_string()))?;
                ops.extend(content.operations.into_iter().map(|op| ContentOp {
                    operator: op.operator,
                    operands: op.operands.iter().map(convert_object).collect(),
                }));
            }
            Segment::InlineImage(bytes) => ops.push(ContentOp::inline_image(bytes.to_vec())),
        }
    }
    Ok(ops)
}

/// Serialize operations back into content stream bytes.
pub fn encode_content(ops: &[ContentOp]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut pending: Vec<Operation> = Vec::new();
    for op in ops {
        match op.inline_image_data() {
            Some(raw) => {
                out.extend(encode_operations(std::mem::take(&mut pending))?);
                out.extend_from_slice(raw);
                out.push(b'\n');
            }
            None => pending.push(Operation::new(
                &op.operator,
                op.operands.iter().map(convert_value).collect(),
            )),
        }
    }
    out.extend(encode_operations(pending)?);
    Ok(out)
}

fn encode_operations(operations: Vec<Operation>) -> Result<Vec<u8>> {
    if operations.is_empty() {
        return Ok(Vec::new());
    }
    let content: Content<Vec<Operation>> = Content { operations };
    content
        .encode()
        .map_err(|e| Error::PdfParse(format!("Failed to encode content stream: {}", e)))
}

enum Segment<'a> {
    Operators(&'a [u8]),
    InlineImage(&'a [u8]),
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Split a content stream at its inline images (`BI ... ID data EI`).
///
/// Strings, hex strings and comments are skipped so a `BI` inside them is
/// not mistaken for an operator. Image data ends at the first `EI` that is
/// preceded by whitespace and followed by whitespace, a delimiter or the end.
fn split_inline_images(data: &[u8]) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while let Some((token_start, token_end)) = next_token(data, pos) {
        pos = token_end;
        if &data[token_start..token_end] != b"BI" {
            continue;
        }
        let image_end = inline_image_end(data, token_end).ok_or_else(|| {
            Error::PdfParse(format!("Unterminated inline image at byte {}", token_start))
        })?;
        if token_start > start {
            segments.push(Segment::Operators(&data[start..token_start]));
        }
        segments.push(Segment::InlineImage(&data[token_start..image_end]));
        start = image_end;
        pos = image_end;
    }
    if start < data.len() {
        segments.push(Segment::Operators(&data[start..]));
    }
    Ok(segments)
}

/// End offset of the inline image whose dictionary starts at `pos`.
fn inline_image_end(data: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let (token_start, token_end) = next_token(data, pos)?;
        pos = token_end;
        if &data[token_start..token_end] == b"ID" {
            break;
        }
    }
    // a single whitespace byte separates ID from the data
    let data_start = (pos + 1).min(data.len());
    let mut i = data_start;
    while i + 2 <= data.len() {
        let after_ok = i + 2 == data.len() || is_whitespace(data[i + 2]) || is_delimiter(data[i + 2]);
        let before_ok = i == data_start || is_whitespace(data[i - 1]);
        if &data[i..i + 2] == b"EI" && before_ok && after_ok {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}

/// Next regular token at or after `pos`, as `(start, end)`.
///
/// Delimited objects (strings, hex strings, names, brackets) are stepped
/// over and never reported.
fn next_token(data: &[u8], mut pos: usize) -> Option<(usize, usize)> {
    while pos < data.len() {
        let b = data[pos];
        match b {
            _ if is_whitespace(b) => pos += 1,
            b'%' => {
                while pos < data.len() && data[pos] != b'\n' && data[pos] != b'\r' {
                    pos += 1;
                }
            }
            b'(' => pos = skip_literal_string(data, pos),
            b'<' if data.get(pos + 1) == Some(&b'<') => pos += 2,
            b'<' => {
                while pos < data.len() && data[pos] != b'>' {
                    pos += 1;
                }
                pos += 1;
            }
            b'/' => {
                pos += 1;
                while pos < data.len() && !is_whitespace(data[pos]) && !is_delimiter(data[pos]) {
                    pos += 1;
                }
            }
            _ if is_delimiter(b) => pos += 1,
            _ => {
                let start = pos;
                while pos < data.len() && !is_whitespace(data[pos]) && !is_delimiter(data[pos]) {
                    pos += 1;
                }
                return Some((start, pos));
            }
        }
    }
    None
}

fn skip_literal_string(data: &[u8], mut pos: usize) -> usize {
    let mut depth = 0usize;
    while pos < data.len() {
        match data[pos] {
            b'\\' => pos += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return pos + 1;
                }
            }
            _ => {}
        }
        pos += 1;
    }
    pos
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Boolean(b) => PdfValue::Bool(*b),
        Object::Null => PdfValue::Null,
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        _ => PdfValue::Other,
    }
}

/// Convert a [`PdfValue`] back to a `lopdf::Object`.
fn convert_value(val: &PdfValue) -> Object {
    match val {
        PdfValue::Integer(i) => Object::Integer(*i),
        PdfValue::Real(r) => Object::Real(*r),
        PdfValue::Bool(b) => Object::Boolean(*b),
        PdfValue::Name(n) => Object::Name(n.clone()),
        PdfValue::Str(b) => Object::String(b.clone(), StringFormat::Literal),
        PdfValue::Array(arr) => Object::Array(arr.iter().map(convert_value).collect()),
        PdfValue::Dict(entries) => {
            let mut dict = Dictionary::new();
            for (k, v) in entries {
                dict.set(k.clone(), convert_value(v));
            }
            Object::Dictionary(dict)
        }
        PdfValue::Null | PdfValue::Other => Object::Null,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// lopdf object helpers
// ---------------------------------------------------------------------------

/// Follow references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, mut obj: &'a Object) -> &'a Object {
    for _ in 0..32 {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => obj = target,
                Err(_) => return &Object::Null,
            },
            _ => return obj,
        }
    }
    &Object::Null
}

/// Look up a key and resolve the value.
pub(crate) fn dict_get<'a>(
    doc: &'a LopdfDocument,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().map(|o| resolve(doc, o))
}

pub(crate) fn dict_get_dict<'a>(
    doc: &'a LopdfDocument,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    match dict_get(doc, dict, key)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

pub(crate) fn dict_get_name(doc: &LopdfDocument, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict_get(doc, dict, key)? {
        Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
        _ => None,
    }
}

/// Numeric value of an integer or real object.
pub(crate) fn object_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

pub(crate) fn dict_get_number(doc: &LopdfDocument, dict: &Dictionary, key: &[u8]) -> Option<f32> {
    dict_get(doc, dict, key).and_then(object_number)
}

/// A text string object decoded to Rust (PDFDocEncoding approximated by Latin-1).
pub(crate) fn object_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
        _ => None,
    }
}

/// A rectangle array `[x0 y0 x1 y1]` in PDF user space.
pub(crate) fn object_rect(doc: &LopdfDocument, obj: &Object) -> Option<Rect> {
    let Object::Array(arr) = resolve(doc, obj) else {
        return None;
    };
    let nums: Vec<f32> = arr
        .iter()
        .filter_map(|o| object_number(resolve(doc, o)))
        .collect();
    match nums.as_slice() {
        [x0, y0, x1, y1] => Some(Rect::new(*x0, *y0, *x1, *y1).normalize()),
        _ => None,
    }
}

/// Bytes of a stream, decompressed when a filter is present.
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|e| Error::Corrupted(format!("Undecodable stream: {}", e)))
    } else {
        Ok(stream.content.clone())
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self { doc })
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    /// Wrap an existing document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        Self { doc }
    }

    /// Decrypt an encrypted document with a user or owner password.
    pub fn decrypt(&mut self, password: &str) -> Result<()> {
        if !self.doc.is_encrypted() {
            return Ok(());
        }
        self.doc.decrypt(password).map_err(|e| {
            log::debug!("Decryption failed: {}", e);
            Error::Encrypted
        })
    }

    /// Direct access to the underlying `lopdf::Document`.
    ///
    /// Escape hatch for operations not covered by `PdfBackend`
    /// (metadata, outlines, names, embedded files, etc.).
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Mutable access to the underlying `lopdf::Document`.
    pub fn raw_doc_mut(&mut self) -> &mut LopdfDocument {
        &mut self.doc
    }

    /// Consume the backend, returning the document.
    pub fn into_inner(self) -> LopdfDocument {
        self.doc
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self
            .doc
            .trailer
            .get(b"Root")
            .map_err(|_| Error::MissingObject("Root".to_string()))?;
        match resolve(&self.doc, root) {
            Object::Dictionary(d) => Ok(d),
            _ => Err(Error::MissingObject("Root".to_string())),
        }
    }

    /// Object id of the document catalog.
    pub fn catalog_id(&self) -> Result<ObjectId> {
        self.doc
            .trailer
            .get(b"Root")
            .and_then(|o| o.as_reference())
            .map_err(|_| Error::MissingObject("Root".to_string()))
    }

    /// Look up a page attribute, following the `/Parent` chain for
    /// inheritable keys.
    pub(crate) fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        for _ in 0..64 {
            if let Ok(value) = dict.get(key) {
                return Some(resolve(&self.doc, value));
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    /// The resource dictionary of a page (inherited if needed).
    pub fn page_resources(&self, page: PageId) -> Option<&Dictionary> {
        match self.inherited(page, b"Resources")? {
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// One category of a page's resources (e.g. `Font`, `XObject`).
    pub fn page_resource_category(&self, page: PageId, category: &[u8]) -> Option<&Dictionary> {
        let resources = self.page_resources(page)?;
        dict_get_dict(&self.doc, resources, category)
    }

    /// Register `object` under `/Resources/<category>/<name>` of a page.
    ///
    /// The page gets its own copy of an inherited or shared resource
    /// dictionary, so other pages are not affected.
    pub fn set_page_resource(
        &mut self,
        page: PageId,
        category: &[u8],
        name: &[u8],
        object: Object,
    ) -> Result<()> {
        let mut resources = self.page_resources(page).cloned().unwrap_or_default();
        let mut entries = self
            .page_resource_category(page, category)
            .cloned()
            .unwrap_or_default();
        entries.set(name.to_vec(), object);
        resources.set(category.to_vec(), Object::Dictionary(entries));
        self.doc
            .get_object_mut(page)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Object ids of the streams making up the page contents, in order.
    pub fn content_stream_ids(&self, page: PageId) -> Result<Vec<ObjectId>> {
        let page_dict = self.doc.get_dictionary(page)?;
        match page_dict.get(b"Contents") {
            Ok(Object::Reference(r)) => match self.doc.get_object(*r)? {
                Object::Array(arr) => Ok(arr.iter().filter_map(|o| o.as_reference().ok()).collect()),
                _ => Ok(vec![*r]),
            },
            Ok(Object::Array(arr)) => Ok(arr.iter().filter_map(|o| o.as_reference().ok()).collect()),
            Ok(_) => Err(Error::PdfParse("Invalid content stream".to_string())),
            Err(_) => Ok(Vec::new()),
        }
    }

    /// Replace the page contents with a single new stream holding `ops`.
    ///
    /// The previous streams are left in the object table; `save` prunes them
    /// when nothing else refers to them.
    pub fn set_page_content(&mut self, page: PageId, ops: &[ContentOp]) -> Result<()> {
        let data = encode_content(ops)?;
        self.set_page_content_bytes(page, data)
    }

    /// Replace the page contents with a single new stream holding `data`.
    pub fn set_page_content_bytes(&mut self, page: PageId, data: Vec<u8>) -> Result<()> {
        let mut stream = Stream::new(Dictionary::new(), data);
        if let Err(e) = stream.compress() {
            log::debug!("Content stream left uncompressed: {}", e);
        }
        let id = self.doc.add_object(stream);
        self.doc
            .get_object_mut(page)?
            .as_dict_mut()?
            .set("Contents", Object::Reference(id));
        Ok(())
    }

    /// Write the document to a file.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.doc.prune_objects();
        self.doc.save(path)?;
        Ok(())
    }

    /// Write the document to memory.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>> {
        self.doc.prune_objects();
        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }

    fn font_info(&self, name: &[u8], font: &Dictionary) -> BackendFontInfo {
        let doc = &self.doc;
        let base_font = dict_get_name(doc, font, b"BaseFont").unwrap_or_else(|| "Unknown".to_string());
        let subtype = dict_get_name(doc, font, b"Subtype").unwrap_or_default();
        let composite = subtype == "Type0";
        let widths = if composite {
            self.composite_widths(font)
        } else {
            self.simple_widths(font, &subtype, &base_font)
        };
        BackendFontInfo {
            name: name.to_vec(),
            base_font,
            subtype,
            composite,
            has_to_unicode: font.has(b"ToUnicode"),
            widths,
        }
    }

    fn simple_widths(&self, font: &Dictionary, subtype: &str, base_font: &str) -> FontWidths {
        let doc = &self.doc;
        let Some(Object::Array(raw)) = dict_get(doc, font, b"Widths") else {
            return FontWidths::Standard(StandardFont::closest(strip_subset_prefix(base_font)));
        };
        // Type3 glyph space is scaled by the font matrix instead of 1/1000
        let scale = if subtype == "Type3" {
            match dict_get(doc, font, b"FontMatrix") {
                Some(Object::Array(fm)) => fm
                    .first()
                    .and_then(|o| object_number(resolve(doc, o)))
                    .map(|a| a * 1000.0)
                    .unwrap_or(1.0),
                _ => 1.0,
            }
        } else {
            1.0
        };
        let first_char = dict_get_number(doc, font, b"FirstChar").unwrap_or(0.0) as u32;
        let missing = dict_get_dict(doc, font, b"FontDescriptor")
            .and_then(|fd| dict_get_number(doc, fd, b"MissingWidth"))
            .unwrap_or(0.0);
        FontWidths::Simple {
            first_char,
            widths: raw
                .iter()
                .map(|o| object_number(resolve(doc, o)).unwrap_or(missing) * scale)
                .collect(),
            missing: missing * scale,
        }
    }

    fn composite_widths(&self, font: &Dictionary) -> FontWidths {
        let doc = &self.doc;
        let descendant = match dict_get(doc, font, b"DescendantFonts") {
            Some(Object::Array(arr)) => arr.first().and_then(|o| match resolve(doc, o) {
                Object::Dictionary(d) => Some(d),
                _ => None,
            }),
            _ => None,
        };
        let Some(descendant) = descendant else {
            return FontWidths::Composite {
                ranges: Vec::new(),
                default: 1000.0,
            };
        };
        let default = dict_get_number(doc, descendant, b"DW").unwrap_or(1000.0);
        let entries: Vec<WEntry> = match dict_get(doc, descendant, b"W") {
            Some(Object::Array(items)) => items
                .iter()
                .filter_map(|o| match resolve(doc, o) {
                    Object::Array(list) => Some(WEntry::List(
                        list.iter()
                            .filter_map(|w| object_number(resolve(doc, w)))
                            .collect(),
                    )),
                    other => object_number(other).map(WEntry::Number),
                })
                .collect(),
            _ => Vec::new(),
        };
        FontWidths::Composite {
            ranges: FontWidths::parse_w(&entries),
            default,
        }
    }
}

/// Remove a subset tag like `ABCDEF+` from a font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_geometry(&self, number: u32) -> Result<PageGeometry> {
        let page = self.page_id(number)?;
        let mediabox = match self
            .inherited(page, b"MediaBox")
            .and_then(|o| object_rect(&self.doc, o))
        {
            Some(r) => r,
            None => {
                log::warn!("Page {} has no valid MediaBox, assuming Letter", number);
                Rect::new(0.0, 0.0, 612.0, 792.0)
            }
        };
        let cropbox = self
            .inherited(page, b"CropBox")
            .and_then(|o| object_rect(&self.doc, o));
        let rotation = match self.inherited(page, b"Rotate") {
            Some(Object::Integer(r)) => *r,
            Some(Object::Real(r)) => *r as i64,
            _ => 0,
        };
        Ok(PageGeometry::new(number, mediabox, cropbox, rotation))
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(lopdf_fonts
            .iter()
            .map(|(name, font_dict)| self.font_info(name, font_dict))
            .collect())
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        for id in self.content_stream_ids(page_id)? {
            match self.doc.get_object(id)? {
                Object::Stream(s) => {
                    content.extend_from_slice(&stream_bytes(s)?);
                    content.push(b'\n');
                }
                _ => return Err(Error::PdfParse("Invalid content stream".to_string())),
            }
        }
        Ok(content)
    }

    fn decode_glyphs(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> Vec<Glyph> {
        let fonts = self.doc.get_page_fonts(page).ok();
        let Some(font) = fonts.as_ref().and_then(|f| f.get(font_name)) else {
            return bytes
                .iter()
                .map(|&b| Glyph {
                    code: u32::from(b),
                    text: latin1_glyph(b),
                })
                .collect();
        };

        let composite = dict_get_name(&self.doc, font, b"Subtype").as_deref() == Some("Type0");
        let width = if composite { 2 } else { 1 };
        let codes: Vec<(u32, &[u8])> = bytes
            .chunks(width)
            .map(|raw| {
                let code = raw.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
                (code, raw)
            })
            .collect();

        if composite && !font.has(b"ToUnicode") {
            // glyph ids without a unicode map cannot be interpreted
            return codes
                .into_iter()
                .map(|(code, _)| Glyph {
                    code,
                    text: '\u{FFFD}'.to_string(),
                })
                .collect();
        }

        match font.get_font_encoding(&self.doc) {
            Ok(enc) => codes
                .into_iter()
                .map(|(code, raw)| {
                    let text = match LopdfDocument::decode_text(&enc, raw) {
                        Ok(t) if !is_unprintable(&t) => t,
                        _ => '\u{FFFD}'.to_string(),
                    };
                    Glyph { code, text }
                })
                .collect(),
            Err(e) => {
                log::debug!("No encoding for font {:?}: {}", String::from_utf8_lossy(font_name), e);
                codes
                    .into_iter()
                    .map(|(code, raw)| Glyph {
                        code,
                        text: match raw {
                            [b] => latin1_glyph(*b),
                            _ => '\u{FFFD}'.to_string(),
                        },
                    })
                    .collect()
            }
        }
    }
}

fn latin1_glyph(b: u8) -> String {
    let c = b as char;
    if c.is_control() {
        '\u{FFFD}'.to_string()
    } else {
        c.to_string()
    }
}
