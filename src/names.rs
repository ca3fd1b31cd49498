//! Named destinations and explicit destination arrays.

use std::collections::{BTreeMap, HashMap, HashSet};

use lopdf::{Dictionary, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::backend::{dict_get, dict_get_dict, object_number, object_text, resolve, LopdfBackend, PdfBackend};
use crate::error::Result;
use crate::geometry::Point;

/// Name tree recursion limit.
const MAX_DEPTH: usize = 32;

/// Where a destination points to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// 1-indexed target page, `None` when the page cannot be resolved
    pub page: Option<u32>,
    /// Fit type: `XYZ`, `Fit`, `FitH`, `FitV`, `FitR`, `FitB`, `FitBH`, `FitBV`
    pub kind: String,
    /// Target point in page coordinates (`XYZ` only; missing values are 0)
    pub to: Option<Point>,
    /// Zoom factor (`XYZ` only, 0 keeps the current zoom)
    pub zoom: Option<f32>,
    /// Raw numeric parameters in PDF user space (`null` is `None`)
    pub params: Vec<Option<f32>>,
}

/// Page object id → 1-indexed page number.
pub(crate) fn page_numbers(backend: &LopdfBackend) -> HashMap<ObjectId, u32> {
    backend.pages().into_iter().map(|(n, id)| (id, n)).collect()
}

/// Parse a destination array (or a dictionary holding it under `/D`).
pub(crate) fn parse_destination(
    backend: &LopdfBackend,
    pages: &HashMap<ObjectId, u32>,
    obj: &Object,
) -> Option<Destination> {
    let doc = backend.raw_doc();
    let items = match resolve(doc, obj) {
        Object::Array(items) => items,
        Object::Dictionary(d) => match dict_get(doc, d, b"D")? {
            Object::Array(items) => items,
            _ => return None,
        },
        _ => return None,
    };
    let (target, rest) = items.split_first()?;
    let page = match target {
        Object::Reference(id) => pages.get(id).copied(),
        // remote destinations use 0-based page indices
        Object::Integer(i) => u32::try_from(*i).ok().map(|i| i + 1),
        _ => None,
    };
    let kind = match rest.first().map(|o| resolve(doc, o)) {
        Some(Object::Name(n)) => String::from_utf8_lossy(n).to_string(),
        _ => "Fit".to_string(),
    };
    let params: Vec<Option<f32>> = rest
        .iter()
        .skip(1)
        .map(|o| object_number(resolve(doc, o)))
        .collect();

    let (to, zoom) = if kind == "XYZ" {
        let left = params.first().copied().flatten().unwrap_or(0.0);
        let top = params.get(1).copied().flatten().unwrap_or(0.0);
        let zoom = params.get(2).copied().flatten().unwrap_or(0.0);
        let to = page
            .and_then(|n| backend.page_geometry(n).ok())
            .map(|g| Point::new(left, top).transform(&g.matrix()));
        (to, Some(zoom))
    } else {
        (None, None)
    };

    Some(Destination {
        page,
        kind,
        to,
        zoom,
        params,
    })
}

/// All named destinations from the catalog's `/Dests` dictionary and the
/// `/Names/Dests` name tree.
pub fn resolve_names(backend: &LopdfBackend) -> Result<BTreeMap<String, Destination>> {
    let doc = backend.raw_doc();
    let catalog = backend.catalog()?;
    let pages = page_numbers(backend);
    let mut names = BTreeMap::new();

    if let Some(dests) = dict_get_dict(doc, catalog, b"Dests") {
        for (key, value) in dests.iter() {
            if let Some(dest) = parse_destination(backend, &pages, value) {
                names.insert(String::from_utf8_lossy(key).to_string(), dest);
            }
        }
    }

    if let Some(tree) = dict_get_dict(doc, catalog, b"Names").and_then(|n| dict_get_dict(doc, n, b"Dests")) {
        let mut leaves = Vec::new();
        let mut visited = HashSet::new();
        collect_name_tree(backend, tree, 0, &mut visited, &mut leaves);
        for (key, value) in leaves {
            if let Some(dest) = parse_destination(backend, &pages, value) {
                names.insert(key, dest);
            }
        }
    }
    log::debug!("Resolved {} named destination(s)", names.len());
    Ok(names)
}

/// Key/value pairs of a name tree, in tree order.
pub(crate) fn collect_name_tree<'a>(
    backend: &'a LopdfBackend,
    node: &'a Dictionary,
    depth: usize,
    visited: &mut HashSet<*const Dictionary>,
    out: &mut Vec<(String, &'a Object)>,
) {
    if depth > MAX_DEPTH || !visited.insert(node as *const Dictionary) {
        log::warn!("Name tree too deep or cyclic, stopping");
        return;
    }
    let doc = backend.raw_doc();
    if let Some(Object::Array(pairs)) = dict_get(doc, node, b"Names") {
        for pair in pairs.chunks_exact(2) {
            if let Some(key) = object_text(resolve(doc, &pair[0])) {
                out.push((key, &pair[1]));
            }
        }
    }
    if let Some(Object::Array(kids)) = dict_get(doc, node, b"Kids") {
        for kid in kids {
            if let Object::Dictionary(d) = resolve(doc, kid) {
                collect_name_tree(backend, d, depth + 1, visited, out);
            }
        }
    }
}
