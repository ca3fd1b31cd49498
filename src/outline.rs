//! Table of contents: reading and writing the document outline, and its
//! delimited text form.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::backend::{dict_get, dict_get_dict, encode_text_string, object_text, LopdfBackend, PdfBackend};
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::names::{page_numbers, parse_destination, resolve_names, Destination};
use crate::output::{parse_record, write_record};

/// Default distance of a target from the top of its page.
pub const DEFAULT_TOP: f32 = 36.0;

/// Outline items visited at most.
const MAX_ITEMS: usize = 100_000;

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Hierarchy level, starting at 1
    pub level: u32,
    pub title: String,
    /// 1-indexed target page, `None` for entries without a local target
    pub page: Option<u32>,
    /// Target distance from the top of the page (page coordinates)
    pub top: Option<f32>,
}

impl TocEntry {
    pub fn new(level: u32, title: impl Into<String>, page: u32) -> Self {
        Self {
            level,
            title: title.into(),
            page: Some(page),
            top: None,
        }
    }

    pub fn with_top(mut self, top: f32) -> Self {
        self.top = Some(top);
        self
    }
}

/// Read the outline in depth-first order.
pub fn read_toc(backend: &LopdfBackend) -> Result<Vec<TocEntry>> {
    let doc = backend.raw_doc();
    let catalog = backend.catalog()?;
    let Some(outlines) = dict_get_dict(doc, catalog, b"Outlines") else {
        return Ok(Vec::new());
    };
    let pages = page_numbers(backend);
    let named = resolve_names(backend).unwrap_or_default();

    let mut toc = Vec::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut stack: Vec<(Option<ObjectId>, u32)> = vec![(first_child(outlines), 1)];
    while let Some((next, level)) = stack.pop() {
        let Some(id) = next else { continue };
        if !visited.insert(id) || visited.len() > MAX_ITEMS {
            log::warn!("Outline contains a cycle at object {:?}, stopping", id);
            break;
        }
        let item = doc.get_dictionary(id)?;
        let title = dict_get(doc, item, b"Title")
            .and_then(object_text)
            .unwrap_or_default();
        let dest = item_destination(backend, &pages, &named, item);
        toc.push(TocEntry {
            level,
            title: title.trim().to_string(),
            page: dest.as_ref().and_then(|d| d.page),
            top: dest.as_ref().and_then(|d| d.to).map(|p| p.y),
        });
        // siblings after children
        stack.push((next_sibling(item), level));
        stack.push((first_child(item), level + 1));
    }
    Ok(toc)
}

fn first_child(item: &Dictionary) -> Option<ObjectId> {
    item.get(b"First").ok()?.as_reference().ok()
}

fn next_sibling(item: &Dictionary) -> Option<ObjectId> {
    item.get(b"Next").ok()?.as_reference().ok()
}

fn item_destination(
    backend: &LopdfBackend,
    pages: &HashMap<ObjectId, u32>,
    named: &std::collections::BTreeMap<String, Destination>,
    item: &Dictionary,
) -> Option<Destination> {
    let doc = backend.raw_doc();
    let target = match dict_get(doc, item, b"Dest") {
        Some(dest) => dest,
        None => {
            let action = dict_get_dict(doc, item, b"A")?;
            match dict_get(doc, action, b"S") {
                Some(Object::Name(s)) if s == b"GoTo" => dict_get(doc, action, b"D")?,
                _ => return None,
            }
        }
    };
    match target {
        Object::Name(_) | Object::String(..) => {
            let name = object_text(target)?;
            named.get(&name).cloned()
        }
        other => parse_destination(backend, pages, other),
    }
}

/// Check levels, titles and page numbers.
pub fn validate_toc(toc: &[TocEntry], page_count: u32) -> Result<()> {
    let mut previous = 0;
    for (i, entry) in toc.iter().enumerate() {
        let n = i + 1;
        if i == 0 && entry.level != 1 {
            return Err(Error::Outline(format!("entry {}: first level must be 1", n)));
        }
        if entry.level == 0 || entry.level > previous + 1 {
            return Err(Error::Outline(format!(
                "entry {}: level {} after level {}",
                n, entry.level, previous
            )));
        }
        if entry.title.trim().is_empty() {
            return Err(Error::Outline(format!("entry {}: empty title", n)));
        }
        if let Some(page) = entry.page {
            if page == 0 || page > page_count {
                return Err(Error::Outline(format!(
                    "entry {}: page {} is out of range 1-{}",
                    n, page, page_count
                )));
            }
        }
        previous = entry.level;
    }
    Ok(())
}

/// Replace the document outline.
///
/// An empty list removes the outline.
pub fn write_toc(backend: &mut LopdfBackend, toc: &[TocEntry]) -> Result<()> {
    validate_toc(toc, backend.page_count())?;
    let catalog_id = backend.catalog_id()?;
    if toc.is_empty() {
        backend.raw_doc_mut().get_dictionary_mut(catalog_id)?.remove(b"Outlines");
        return Ok(());
    }

    let mut items = Vec::with_capacity(toc.len());
    for entry in toc {
        let mut dict = Dictionary::new();
        dict.set(
            "Title",
            Object::String(encode_text_string(entry.title.trim()), lopdf::StringFormat::Literal),
        );
        if let Some(page) = entry.page {
            let page_id = backend.page_id(page)?;
            let geometry = backend.page_geometry(page)?;
            let top = entry.top.unwrap_or(DEFAULT_TOP);
            let target = Point::new(0.0, top).transform(&geometry.inverse_matrix());
            dict.set(
                "Dest",
                Object::Array(vec![
                    Object::Reference(page_id),
                    Object::Name(b"XYZ".to_vec()),
                    Object::Real(target.x),
                    Object::Real(target.y),
                    Object::Integer(0),
                ]),
            );
        }
        items.push(dict);
    }

    let doc = backend.raw_doc_mut();
    let root_id = doc.new_object_id();
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

    // parent of each entry: the closest preceding entry one level up
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(toc.len());
    let mut open: Vec<usize> = Vec::new();
    for (i, entry) in toc.iter().enumerate() {
        open.truncate(entry.level as usize - 1);
        parents.push(open.last().copied());
        open.push(i);
    }

    let children = |parent: Option<usize>| -> Vec<usize> {
        (0..toc.len()).filter(|&i| parents[i] == parent).collect()
    };
    let link = |dict: &mut Dictionary, kids: &[usize]| {
        if let (Some(first), Some(last)) = (kids.first(), kids.last()) {
            dict.set("First", Object::Reference(ids[*first]));
            dict.set("Last", Object::Reference(ids[*last]));
        }
    };

    for (i, mut dict) in items.into_iter().enumerate() {
        let parent = parents[i].map_or(root_id, |p| ids[p]);
        dict.set("Parent", Object::Reference(parent));
        let siblings = children(parents[i]);
        let pos = siblings.iter().position(|&s| s == i).unwrap_or(0);
        if pos > 0 {
            dict.set("Prev", Object::Reference(ids[siblings[pos - 1]]));
        }
        if let Some(&next) = siblings.get(pos + 1) {
            dict.set("Next", Object::Reference(ids[next]));
        }
        let kids = children(Some(i));
        link(&mut dict, &kids);
        if !kids.is_empty() {
            // closed: negative count of direct children
            dict.set("Count", Object::Integer(-(kids.len() as i64)));
        }
        doc.objects.insert(ids[i], Object::Dictionary(dict));
    }

    let top_level = children(None);
    let mut root = Dictionary::new();
    root.set("Type", Object::Name(b"Outlines".to_vec()));
    link(&mut root, &top_level);
    root.set("Count", Object::Integer(top_level.len() as i64));
    doc.objects.insert(root_id, Object::Dictionary(root));

    doc.get_dictionary_mut(catalog_id)?
        .set("Outlines", Object::Reference(root_id));
    log::debug!("Wrote {} outline item(s)", toc.len());
    Ok(())
}

/// One line per entry: `level;title;page;top`.
///
/// Entries without a target page get page `-1`, a missing top is `0`.
pub fn toc_to_csv(toc: &[TocEntry], delimiter: char) -> String {
    let mut out = String::new();
    for entry in toc {
        let level = entry.level.to_string();
        let page = entry.page.map_or("-1".to_string(), |p| p.to_string());
        let top = entry.top.map_or("0".to_string(), |t| t.to_string());
        out.push_str(&write_record(
            &[level.as_str(), entry.title.trim(), page.as_str(), top.as_str()],
            delimiter,
        ));
        out.push('\n');
    }
    out
}

/// Parse `level;title;page[;top]` lines. Blank lines are skipped; a top of
/// `0` or less means the default position.
pub fn toc_from_csv(text: &str, delimiter: char) -> Result<Vec<TocEntry>> {
    let mut toc = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_record(line, delimiter);
        let bad = |message: String| Error::Delimited {
            line: line_no,
            message,
        };
        if fields.len() < 3 || fields.len() > 4 {
            return Err(bad(format!("expected 3 or 4 fields, found {}", fields.len())));
        }
        let level: u32 = fields[0]
            .trim()
            .parse()
            .map_err(|_| bad(format!("invalid level '{}'", fields[0])))?;
        let page: i64 = fields[2]
            .trim()
            .parse()
            .map_err(|_| bad(format!("invalid page '{}'", fields[2])))?;
        let top = match fields.get(3) {
            Some(t) => Some(
                t.trim()
                    .parse::<f32>()
                    .map_err(|_| bad(format!("invalid top '{}'", t)))?,
            ),
            None => None,
        };
        toc.push(TocEntry {
            level,
            title: fields[1].clone(),
            page: u32::try_from(page).ok().filter(|p| *p > 0),
            top: top.filter(|t| *t > 0.0),
        });
    }
    Ok(toc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document};

    fn three_pages() -> LopdfBackend {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..3)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => 3 }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        LopdfBackend::from_document(doc)
    }

    fn sample() -> Vec<TocEntry> {
        vec![
            TocEntry::new(1, "Intro", 1),
            TocEntry::new(2, "Motivation", 1).with_top(300.0),
            TocEntry::new(2, "Scope; limits", 2),
            TocEntry::new(3, "Détails", 2),
            TocEntry::new(1, "Appendix", 3),
        ]
    }

    #[test]
    fn test_write_then_read() {
        let mut backend = three_pages();
        write_toc(&mut backend, &sample()).unwrap();
        let bytes = backend.save_to_bytes().unwrap();

        let reloaded = LopdfBackend::load_bytes(&bytes).unwrap();
        let toc = read_toc(&reloaded).unwrap();
        let expected: Vec<TocEntry> = sample()
            .into_iter()
            .map(|mut e| {
                e.top = Some(e.top.unwrap_or(DEFAULT_TOP));
                e
            })
            .collect();
        assert_eq!(toc, expected);
    }

    #[test]
    fn test_validation() {
        assert!(validate_toc(&sample(), 3).is_ok());
        assert!(validate_toc(&[TocEntry::new(2, "x", 1)], 3).is_err());
        assert!(validate_toc(&[TocEntry::new(1, "a", 1), TocEntry::new(3, "b", 1)], 3).is_err());
        assert!(validate_toc(&[TocEntry::new(1, " ", 1)], 3).is_err());
        assert!(validate_toc(&[TocEntry::new(1, "a", 4)], 3).is_err());
    }

    #[test]
    fn test_csv_roundtrip() {
        let csv = toc_to_csv(&sample(), ';');
        assert!(csv.starts_with("1;Intro;1;0\n2;Motivation;1;300\n2;\"Scope; limits\";2;0\n"));
        assert_eq!(toc_from_csv(&csv, ';').unwrap(), sample());
    }

    #[test]
    fn test_csv_errors_carry_line_numbers() {
        let err = toc_from_csv("1;a;1\n\nx;b;2\n", ';').unwrap_err();
        assert!(matches!(err, Error::Delimited { line: 3, .. }));
        assert!(toc_from_csv("1;a", ';').is_err());
    }
}
