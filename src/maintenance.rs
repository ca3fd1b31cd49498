//! Page surgery: derotation, content stream combination, annotation removal
//! and page selection.

use lopdf::Object;

use crate::backend::{object_rect, ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue};
use crate::error::{Error, Result};
use crate::geometry::{Matrix, Rect};
use crate::pages::PageSelection;

/// Concatenate a page's content streams into a single stream.
///
/// Returns `false` when the page already has at most one stream.
pub fn combine_page_contents(backend: &mut LopdfBackend, page: PageId) -> Result<bool> {
    if backend.content_stream_ids(page)?.len() < 2 {
        return Ok(false);
    }
    let data = backend.page_content(page)?;
    backend.set_page_content_bytes(page, data)?;
    Ok(true)
}

/// Combine the content streams of every page; returns the number of pages
/// changed.
pub fn combine_contents(backend: &mut LopdfBackend) -> Result<usize> {
    let mut changed = 0;
    for (number, page) in backend.pages() {
        if combine_page_contents(backend, page)? {
            log::debug!("Combined content streams of page {}", number);
            changed += 1;
        }
    }
    Ok(changed)
}

/// Set the rotation of the selected pages to zero without changing their
/// appearance.
///
/// The page contents are wrapped in a transformation showing them the way
/// the rotated page did; the media box becomes the displayed page
/// rectangle and annotation rectangles move along. Returns the numbers of
/// the pages changed.
pub fn derotate_pages(backend: &mut LopdfBackend, pages: &PageSelection) -> Result<Vec<u32>> {
    let mut changed = Vec::new();
    for number in pages.resolve(backend.page_count())? {
        let geometry = backend.page_geometry(number)?;
        if geometry.rotation == 0 && geometry.cropbox.x0 == 0.0 && geometry.cropbox.y0 == 0.0 {
            continue;
        }
        let page = backend.page_id(number)?;
        let (width, height) = (geometry.width(), geometry.height());
        let m = geometry
            .matrix()
            .concat(&Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, height));

        let mut ops = vec![
            ContentOp::new("q", vec![]),
            ContentOp::new("cm", m.to_array().into_iter().map(PdfValue::real).collect()),
        ];
        ops.extend(backend.decode_content(&backend.page_content(page)?)?);
        ops.push(ContentOp::new("Q", vec![]));
        backend.set_page_content(page, &ops)?;

        move_annotations(backend, page, &m)?;

        let dict = backend.raw_doc_mut().get_object_mut(page)?.as_dict_mut()?;
        dict.set(
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)]),
        );
        dict.remove(b"CropBox");
        dict.set("Rotate", 0);
        log::debug!("Derotated page {} (was {} degrees)", number, geometry.rotation);
        changed.push(number);
    }
    Ok(changed)
}

fn move_annotations(backend: &mut LopdfBackend, page: PageId, m: &Matrix) -> Result<()> {
    let doc = backend.raw_doc();
    let annots: Vec<Object> = match doc.get_dictionary(page)?.get(b"Annots") {
        Ok(obj) => match crate::backend::resolve(doc, obj) {
            Object::Array(items) => items.clone(),
            _ => Vec::new(),
        },
        Err(_) => Vec::new(),
    };
    for annot in annots {
        let Ok(id) = annot.as_reference() else {
            continue;
        };
        let rect = match backend.raw_doc().get_dictionary(id) {
            Ok(dict) => dict
                .get(b"Rect")
                .ok()
                .and_then(|r| object_rect(backend.raw_doc(), r)),
            Err(_) => None,
        };
        if let Some(rect) = rect {
            let Rect { x0, y0, x1, y1 } = rect.transform(m);
            backend.raw_doc_mut().get_dictionary_mut(id)?.set(
                "Rect",
                Object::Array(vec![
                    Object::Real(x0),
                    Object::Real(y0),
                    Object::Real(x1),
                    Object::Real(y1),
                ]),
            );
        }
    }
    Ok(())
}

/// Remove annotations from every page; widgets (form fields) are kept when
/// `keep_widgets` is set. Returns the number of annotations removed.
pub fn strip_annotations(backend: &mut LopdfBackend, keep_widgets: bool) -> Result<usize> {
    let mut removed = 0;
    for (number, page) in backend.pages() {
        let doc = backend.raw_doc();
        let annots: Vec<Object> = match doc.get_dictionary(page)?.get(b"Annots") {
            Ok(obj) => match crate::backend::resolve(doc, obj) {
                Object::Array(items) => items.clone(),
                _ => continue,
            },
            Err(_) => continue,
        };
        let kept: Vec<Object> = annots
            .iter()
            .filter(|a| keep_widgets && is_widget(backend, a))
            .cloned()
            .collect();
        let count = annots.len() - kept.len();
        if count == 0 {
            continue;
        }
        let dict = backend.raw_doc_mut().get_dictionary_mut(page)?;
        if kept.is_empty() {
            dict.remove(b"Annots");
        } else {
            dict.set("Annots", Object::Array(kept));
        }
        log::debug!("Removed {} annotation(s) from page {}", count, number);
        removed += count;
    }
    Ok(removed)
}

fn is_widget(backend: &LopdfBackend, annot: &Object) -> bool {
    let doc = backend.raw_doc();
    match crate::backend::resolve(doc, annot) {
        Object::Dictionary(d) => {
            crate::backend::dict_get_name(doc, d, b"Subtype").as_deref() == Some("Widget")
        }
        _ => false,
    }
}

/// Keep only the selected pages, in document order.
pub fn select_pages(backend: &mut LopdfBackend, pages: &PageSelection) -> Result<Vec<u32>> {
    let count = backend.page_count();
    let keep = pages.resolve(count)?;
    if keep.is_empty() {
        return Err(Error::InvalidPageRange("no pages selected".to_string()));
    }
    let delete: Vec<u32> = (1..=count).filter(|n| !keep.contains(n)).collect();
    if !delete.is_empty() {
        backend.raw_doc_mut().delete_pages(&delete);
    }
    log::debug!("Kept {} of {} page(s)", keep.len(), count);
    Ok(keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Stream};

    fn doc_with(rotate: i64, contents: Vec<&[u8]>, annots: Vec<lopdf::Dictionary>) -> LopdfBackend {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let streams: Vec<Object> = contents
            .into_iter()
            .map(|c| doc.add_object(Stream::new(dictionary! {}, c.to_vec())).into())
            .collect();
        let annots: Vec<Object> = annots.into_iter().map(|a| doc.add_object(a).into()).collect();
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 600.into(), 800.into()],
            "Rotate" => rotate,
            "Contents" => streams,
            "Annots" => annots,
            "Resources" => dictionary! {},
        });
        let second = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 600.into(), 800.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page.into(), second.into()],
                "Count" => 2,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        LopdfBackend::from_document(doc)
    }

    #[test]
    fn test_combine_contents() {
        let mut backend = doc_with(0, vec![b"0 0 m", b"10 10 l S"], vec![]);
        assert_eq!(combine_contents(&mut backend).unwrap(), 1);
        let page = backend.page_id(1).unwrap();
        assert_eq!(backend.content_stream_ids(page).unwrap().len(), 1);
        let ops = backend.decode_content(&backend.page_content(page).unwrap()).unwrap();
        let operators: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(operators, ["m", "l", "S"]);
        assert_eq!(combine_contents(&mut backend).unwrap(), 0);
    }

    #[test]
    fn test_derotate_keeps_appearance() {
        let annot = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Square",
            "Rect" => vec![10.into(), 20.into(), 30.into(), 40.into()],
        };
        let mut backend = doc_with(90, vec![b"10 20 m 30 40 l S"], vec![annot]);
        let before = crate::graphics::page_paths(&backend, 1).unwrap();

        assert_eq!(derotate_pages(&mut backend, &PageSelection::Range(1..=1)).unwrap(), [1]);
        let geometry = backend.page_geometry(1).unwrap();
        assert_eq!(geometry.rotation, 0);
        assert_eq!(geometry.mediabox, Rect::new(0.0, 0.0, 800.0, 600.0));

        let after = crate::graphics::page_paths(&backend, 1).unwrap();
        assert_eq!(before.len(), 1);
        let (a, b) = (before[0].rect, after[0].rect);
        assert!((a.x0 - b.x0).abs() < 1e-3 && (a.y0 - b.y0).abs() < 1e-3);
        assert!((a.x1 - b.x1).abs() < 1e-3 && (a.y1 - b.y1).abs() < 1e-3);
    }

    #[test]
    fn test_strip_annotations_keeps_widgets() {
        let link = dictionary! { "Type" => "Annot", "Subtype" => "Link" };
        let widget = dictionary! { "Type" => "Annot", "Subtype" => "Widget" };
        let mut backend = doc_with(0, vec![b""], vec![link, widget]);
        assert_eq!(strip_annotations(&mut backend, true).unwrap(), 1);
        assert_eq!(strip_annotations(&mut backend, false).unwrap(), 1);
        assert_eq!(strip_annotations(&mut backend, false).unwrap(), 0);
    }

    #[test]
    fn test_select_pages() {
        let mut backend = doc_with(0, vec![b""], vec![]);
        assert_eq!(select_pages(&mut backend, &PageSelection::Pages(vec![2])).unwrap(), [2]);
        assert_eq!(backend.page_count(), 1);
        assert!(select_pages(&mut backend, &PageSelection::Pages(vec![5])).is_err());
    }
}
