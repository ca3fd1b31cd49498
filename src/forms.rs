//! Interactive form fields (widgets).

use lopdf::{Dictionary, Document, Object};
use serde::{Deserialize, Serialize};

use crate::backend::{dict_get, dict_get_dict, object_number, object_rect, object_text, resolve, LopdfBackend, PdfBackend};
use crate::error::Result;
use crate::geometry::Rect;

/// Field flag names by bit position (bit 0 is the lowest bit).
const FLAG_NAMES: [&str; 27] = [
    "ReadOnly",
    "Required",
    "NoExport",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "Multiline",
    "Password",
    "NoToggleToOff",
    "Radio",
    "Pushbutton",
    "Combo",
    "Edit",
    "Sort",
    "FileSelect",
    "MultiSelect",
    "DoNotSpellCheck",
    "DoNotScroll",
    "Comb",
    "RichText",
    "CommitOnSelChange",
];

/// Depth limit for `/Parent` chains.
const MAX_PARENTS: usize = 32;

/// A form field widget on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// 1-indexed page number
    pub page: u32,
    /// Fully qualified name (`parent.child`)
    pub name: String,
    /// `Text`, `CheckBox`, `RadioButton`, `PushButton`, `ComboBox`,
    /// `ListBox`, `Signature` or `Unknown`
    pub field_type: String,
    /// Current value as text
    pub value: String,
    /// Raw `/Ff` value
    pub flags: u32,
    /// Widget rectangle in page coordinates
    pub rect: Rect,
}

impl FormField {
    /// Names of the flags set in [`FormField::flags`].
    pub fn flag_names(&self) -> Vec<&'static str> {
        flag_names(self.flags)
    }
}

/// Names of the set bits of a field flags value.
pub fn flag_names(flags: u32) -> Vec<&'static str> {
    FLAG_NAMES
        .iter()
        .enumerate()
        .filter(|(bit, name)| !name.is_empty() && flags & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// Whether the document has an interactive form with fields.
pub fn is_form(backend: &LopdfBackend) -> bool {
    let doc = backend.raw_doc();
    backend
        .catalog()
        .ok()
        .and_then(|c| dict_get_dict(doc, c, b"AcroForm"))
        .and_then(|f| dict_get(doc, f, b"Fields"))
        .is_some_and(|fields| matches!(fields, Object::Array(a) if !a.is_empty()))
}

/// All widgets of all pages, in page and annotation order.
pub fn list_fields(backend: &LopdfBackend) -> Result<Vec<FormField>> {
    let doc = backend.raw_doc();
    let mut fields = Vec::new();
    for (number, page) in backend.pages() {
        let annots = doc.get_dictionary(page)?.get(b"Annots").ok();
        let Some(Object::Array(annots)) = annots.map(|a| resolve(doc, a)) else {
            continue;
        };
        let matrix = backend.page_geometry(number)?.matrix();
        for annot in annots {
            let Object::Dictionary(widget) = resolve(doc, annot) else {
                continue;
            };
            if crate::backend::dict_get_name(doc, widget, b"Subtype").as_deref() != Some("Widget") {
                continue;
            }
            let rect = widget
                .get(b"Rect")
                .ok()
                .and_then(|r| object_rect(doc, r))
                .map(|r| r.transform(&matrix))
                .unwrap_or_default();
            fields.push(field_of(doc, widget, number, rect));
        }
    }
    log::debug!("Found {} form field widget(s)", fields.len());
    Ok(fields)
}

fn field_of(doc: &Document, widget: &Dictionary, page: u32, rect: Rect) -> FormField {
    let mut parts = Vec::new();
    let mut ft = None;
    let mut ff = None;
    let mut value = None;

    let mut node = Some(widget);
    let mut depth = 0;
    while let Some(dict) = node {
        if let Some(t) = dict_get(doc, dict, b"T").and_then(object_text) {
            parts.push(t);
        }
        if ft.is_none() {
            ft = crate::backend::dict_get_name(doc, dict, b"FT");
        }
        if ff.is_none() {
            ff = dict_get(doc, dict, b"Ff").and_then(object_number);
        }
        if value.is_none() {
            value = dict_get(doc, dict, b"V").and_then(value_text);
        }
        depth += 1;
        node = if depth < MAX_PARENTS {
            dict_get_dict(doc, dict, b"Parent")
        } else {
            None
        };
    }
    parts.reverse();

    let flags = ff.map(|f| f as u32).unwrap_or(0);
    FormField {
        page,
        name: parts.join("."),
        field_type: field_type(ft.as_deref(), flags).to_string(),
        value: value.unwrap_or_default(),
        flags,
        rect,
    }
}

fn field_type(ft: Option<&str>, flags: u32) -> &'static str {
    match ft {
        Some("Tx") => "Text",
        Some("Btn") if flags & (1 << 16) != 0 => "PushButton",
        Some("Btn") if flags & (1 << 15) != 0 => "RadioButton",
        Some("Btn") => "CheckBox",
        Some("Ch") if flags & (1 << 17) != 0 => "ComboBox",
        Some("Ch") => "ListBox",
        Some("Sig") => "Signature",
        _ => "Unknown",
    }
}

fn value_text(obj: &Object) -> Option<String> {
    match obj {
        Object::Array(items) => Some(
            items
                .iter()
                .filter_map(object_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => object_text(other),
    }
}
