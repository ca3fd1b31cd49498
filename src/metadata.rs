//! Document information dictionary: read, write and delimited export.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use lopdf::{Dictionary, Object, StringFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::backend::{dict_get, encode_text_string, object_text, resolve, LopdfBackend};
use crate::error::{Error, Result};
use crate::output::{parse_record, write_record};

/// Document metadata.
///
/// Dates are kept as PDF date strings (`D:YYYYMMDDHHmmSS+HH'mm'`); use
/// [`Metadata::created`] and [`Metadata::modified`] for parsed values.
/// `format` and `encryption` describe the file and are never written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub format: String,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creator: String,
    pub producer: String,
    pub creation_date: String,
    pub mod_date: String,
    pub trapped: String,
    pub encryption: String,
}

/// Keys in export order, with their Info dictionary entries.
const KEYS: [(&str, Option<&[u8]>); 11] = [
    ("format", None),
    ("title", Some(b"Title")),
    ("author", Some(b"Author")),
    ("subject", Some(b"Subject")),
    ("keywords", Some(b"Keywords")),
    ("creator", Some(b"Creator")),
    ("producer", Some(b"Producer")),
    ("creationDate", Some(b"CreationDate")),
    ("modDate", Some(b"ModDate")),
    ("trapped", Some(b"Trapped")),
    ("encryption", None),
];

impl Metadata {
    /// Value of an exported key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "format" => &self.format,
            "title" => &self.title,
            "author" => &self.author,
            "subject" => &self.subject,
            "keywords" => &self.keywords,
            "creator" => &self.creator,
            "producer" => &self.producer,
            "creationDate" => &self.creation_date,
            "modDate" => &self.mod_date,
            "trapped" => &self.trapped,
            "encryption" => &self.encryption,
            _ => return None,
        };
        Some(value)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut String> {
        let value = match key {
            "format" => &mut self.format,
            "title" => &mut self.title,
            "author" => &mut self.author,
            "subject" => &mut self.subject,
            "keywords" => &mut self.keywords,
            "creator" => &mut self.creator,
            "producer" => &mut self.producer,
            "creationDate" => &mut self.creation_date,
            "modDate" => &mut self.mod_date,
            "trapped" => &mut self.trapped,
            "encryption" => &mut self.encryption,
            _ => return None,
        };
        Some(value)
    }

    /// Set an exported key; returns `false` for unknown keys.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.get_mut(key) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Key/value pairs in export order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        KEYS.iter()
            .filter_map(|(key, _)| self.get(key).map(|v| (*key, v)))
            .collect()
    }

    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        parse_pdf_date(&self.creation_date)
    }

    pub fn modified(&self) -> Option<DateTime<FixedOffset>> {
        parse_pdf_date(&self.mod_date)
    }

    /// Set both dates to the current time.
    pub fn touch(&mut self) {
        let now = pdf_date(&Utc::now().fixed_offset());
        if self.creation_date.is_empty() {
            self.creation_date = now.clone();
        }
        self.mod_date = now;
    }
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`, everything after the
/// year optional).
pub fn parse_pdf_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let re = Regex::new(
        r"^(?:D:)?(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?(?:([Zz+-])(\d{2})?'?(\d{2})?'?)?$",
    )
    .ok()?;
    let caps = re.captures(s.trim())?;
    let field = |i: usize, default: u32| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, field(2, 1)?, field(3, 1)?)?
        .and_hms_opt(field(4, 0)?, field(5, 0)?, field(6, 0)?)?;

    let sign = match caps.get(7).map(|m| m.as_str()) {
        Some("-") => -1,
        _ => 1,
    };
    let seconds = field(8, 0)? as i32 * 3600 + field(9, 0)? as i32 * 60;
    FixedOffset::east_opt(sign * seconds)?
        .from_local_datetime(&naive)
        .single()
}

/// Format a timestamp as a PDF date string.
pub fn pdf_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let seconds = date.offset().fix().local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!(
        "D:{}{}{:02}'{:02}'",
        date.format("%Y%m%d%H%M%S"),
        sign,
        minutes / 60,
        minutes % 60
    )
}

fn info_dict(backend: &LopdfBackend) -> Option<&Dictionary> {
    let doc = backend.raw_doc();
    match resolve(doc, doc.trailer.get(b"Info").ok()?) {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Read the document information dictionary.
pub fn read_metadata(backend: &LopdfBackend) -> Metadata {
    let doc = backend.raw_doc();
    let mut meta = Metadata {
        format: format!("PDF {}", backend.version()),
        ..Default::default()
    };
    if backend.is_encrypted() {
        meta.encryption = match doc.trailer.get(b"Encrypt").ok().map(|o| resolve(doc, o)) {
            Some(Object::Dictionary(d)) => encryption_name(doc, d),
            _ => "encrypted".to_string(),
        };
    }
    if let Some(info) = info_dict(backend) {
        for (key, entry) in KEYS.iter() {
            let Some(entry) = entry else { continue };
            if let Some(value) = dict_get(doc, info, entry).and_then(object_text) {
                meta.set(key, value);
            }
        }
    }
    meta
}

fn encryption_name(doc: &lopdf::Document, encrypt: &Dictionary) -> String {
    let filter = crate::backend::dict_get_name(doc, encrypt, b"Filter").unwrap_or_default();
    let v = crate::backend::dict_get_number(doc, encrypt, b"V").unwrap_or(0.0) as i64;
    let r = crate::backend::dict_get_number(doc, encrypt, b"R").unwrap_or(0.0) as i64;
    format!("{} V{} R{}", filter, v, r)
}

/// Write metadata into the information dictionary.
///
/// Empty values remove their entry. With `delete_xml` the catalog's XMP
/// `/Metadata` stream is dropped as well, so that viewers do not prefer it.
pub fn write_metadata(backend: &mut LopdfBackend, meta: &Metadata, delete_xml: bool) -> Result<()> {
    let mut info = info_dict(backend).cloned().unwrap_or_default();
    for (key, entry) in KEYS.iter() {
        let Some(entry) = entry else { continue };
        let value = meta.get(key).unwrap_or_default();
        if value.is_empty() {
            info.remove(entry);
        } else if *entry == b"Trapped" {
            info.set(*entry, Object::Name(trapped_name(value)?.to_vec()));
        } else {
            info.set(
                *entry,
                Object::String(encode_text_string(value), StringFormat::Literal),
            );
        }
    }

    let doc = backend.raw_doc_mut();
    match doc.trailer.get(b"Info").and_then(Object::as_reference) {
        Ok(id) => {
            doc.objects.insert(id, Object::Dictionary(info));
        }
        Err(_) => {
            let id = doc.add_object(info);
            doc.trailer.set("Info", id);
        }
    }

    if delete_xml {
        let catalog = backend.catalog_id()?;
        let dict = backend.raw_doc_mut().get_dictionary_mut(catalog)?;
        if dict.remove(b"Metadata").is_some() {
            log::debug!("Removed XML metadata stream");
        }
    }
    Ok(())
}

fn trapped_name(value: &str) -> Result<&'static [u8]> {
    match value.trim_start_matches('/').to_ascii_lowercase().as_str() {
        "true" => Ok(b"True"),
        "false" => Ok(b"False"),
        "unknown" => Ok(b"Unknown"),
        other => Err(Error::Other(format!(
            "Trapped must be True, False or Unknown, not '{}'",
            other
        ))),
    }
}

/// One `key<delim>value` line per exported key.
pub fn metadata_to_csv(meta: &Metadata, delimiter: char) -> String {
    meta.entries()
        .into_iter()
        .map(|(key, value)| write_record(&[key, value], delimiter) + "\n")
        .collect()
}

/// Apply `key<delim>value` lines on top of `base`.
///
/// Blank lines are skipped; unknown keys and lines without a value are
/// errors. `format` and `encryption` are accepted and ignored.
pub fn metadata_from_csv(text: &str, delimiter: char, base: &Metadata) -> Result<Metadata> {
    let mut meta = base.clone();
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_record(line, delimiter);
        let [key, value] = fields.as_slice() else {
            return Err(Error::Delimited {
                line: number + 1,
                message: format!("expected 2 fields, found {}", fields.len()),
            });
        };
        let key = key.trim();
        if key == "format" || key == "encryption" {
            continue;
        }
        if !meta.set(key, value.as_str()) {
            return Err(Error::Delimited {
                line: number + 1,
                message: format!("unknown metadata key '{}'", key),
            });
        }
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use lopdf::{dictionary, Document, Stream};

    fn backend() -> LopdfBackend {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => Vec::<Object>::new(), "Count" => 0 }),
        );
        let xmp = doc.add_object(Stream::new(dictionary! { "Type" => "Metadata" }, b"<x/>".to_vec()));
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Metadata" => xmp,
        });
        doc.trailer.set("Root", catalog);
        let info = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Annual Report"),
            "CreationDate" => Object::string_literal("D:20240115103045+01'00'"),
            "Trapped" => "False",
        });
        doc.trailer.set("Info", info);
        LopdfBackend::from_document(doc)
    }

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240115103045+01'00'").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
        assert_eq!(date.hour(), 10);
        assert_eq!(date.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_parse_pdf_date_minimal() {
        let date = parse_pdf_date("D:2024").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 1));
        assert!(parse_pdf_date("D:20").is_none());
        assert!(parse_pdf_date("D:2024ab").is_none());
    }

    #[test]
    fn test_pdf_date_format() {
        let date = parse_pdf_date("D:20231231235959-05'30'").unwrap();
        assert_eq!(pdf_date(&date), "D:20231231235959-05'30'");
    }

    #[test]
    fn test_read_metadata() {
        let meta = read_metadata(&backend());
        assert_eq!(meta.format, "PDF 1.7");
        assert_eq!(meta.title, "Annual Report");
        assert_eq!(meta.trapped, "False");
        assert_eq!(meta.author, "");
        assert_eq!(meta.created().unwrap().year(), 2024);
    }

    #[test]
    fn test_csv_roundtrip_and_write() {
        let mut backend = backend();
        let meta = read_metadata(&backend);
        let csv = metadata_to_csv(&meta, ';');
        assert!(csv.starts_with("format;PDF 1.7\ntitle;Annual Report\n"));

        let edited = csv.replace("author;", "author;Jane Roe; Editor");
        let new = metadata_from_csv(&edited, ';', &meta);
        // the value now contains the delimiter without quotes
        assert!(matches!(new, Err(Error::Delimited { line: 3, .. })));

        let edited = csv.replace("author;", "author;\"Jane Roe; Editor\"");
        let new = metadata_from_csv(&edited, ';', &meta).unwrap();
        assert_eq!(new.author, "Jane Roe; Editor");

        write_metadata(&mut backend, &new, true).unwrap();
        let reread = read_metadata(&backend);
        assert_eq!(reread, new);
        assert!(backend.catalog().unwrap().get(b"Metadata").is_err());
    }

    #[test]
    fn test_unknown_key() {
        let err = metadata_from_csv("colour;blue\n", ';', &Metadata::default()).unwrap_err();
        assert!(matches!(err, Error::Delimited { line: 1, .. }));
    }
}
