//! Image XObjects: listing and extraction.
//!
//! Every image object in the file is visited, whether or not a page uses
//! it. JPEG and JPEG 2000 data is written as stored; raw 8-bit gray and RGB
//! samples are converted to PNG.

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

use crate::backend::{dict_get, dict_get_number, resolve, stream_bytes, LopdfBackend};
use crate::error::{Error, Result};
use crate::options::LoadOptions;

/// An image object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Object number
    pub xref: u32,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u32,
    /// Color space family (`DeviceRGB`, `ICCBased`, ...)
    pub color_space: String,
    /// Number of color components, 0 when unknown
    pub components: u32,
    /// Last filter of the stream, empty when unfiltered
    pub filter: String,
    /// Object number of the soft mask
    pub smask: Option<u32>,
    /// Stored stream length
    pub length: usize,
}

/// Image data ready to be written to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub xref: u32,
    /// File extension: `jpg`, `jpx` or `png`
    pub ext: &'static str,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Thresholds for skipping insignificant images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageFilter {
    /// Both sides must be larger than this many pixels
    pub min_side: u32,
    /// Extracted data must be larger than this many bytes
    pub min_bytes: usize,
    /// Extracted size relative to the raw sample size must exceed this
    /// (very compressible images are usually single-coloured)
    pub min_ratio: f32,
}

impl ImageFilter {
    /// Keep everything.
    pub fn none() -> Self {
        Self {
            min_side: 0,
            min_bytes: 0,
            min_ratio: 0.0,
        }
    }

    /// Skip small images (sides up to 100 pixels or up to 2 KB of data)
    /// and images compressing to 5% or less.
    pub fn significant() -> Self {
        Self {
            min_side: 100,
            min_bytes: 2048,
            min_ratio: 0.05,
        }
    }

    pub fn with_min_side(mut self, min_side: u32) -> Self {
        self.min_side = min_side;
        self
    }

    fn accepts(&self, info: &ImageInfo, image: &ExtractedImage) -> bool {
        if info.width.min(info.height) <= self.min_side && self.min_side > 0 {
            return false;
        }
        if image.data.len() <= self.min_bytes && self.min_bytes > 0 {
            return false;
        }
        let samples = info.width as f32 * info.height as f32 * info.components.max(1) as f32;
        samples == 0.0 || image.data.len() as f32 / samples > self.min_ratio
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::none()
    }
}

fn image_info(doc: &Document, id: ObjectId, stream: &Stream) -> ImageInfo {
    let dict = &stream.dict;
    let (color_space, components) = color_space(doc, dict_get(doc, dict, b"ColorSpace"));
    let filter = match dict_get(doc, dict, b"Filter") {
        Some(Object::Name(n)) => String::from_utf8_lossy(n).to_string(),
        Some(Object::Array(items)) => items
            .last()
            .and_then(|o| resolve(doc, o).as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    ImageInfo {
        xref: id.0,
        width: dict_u32(doc, dict, b"Width"),
        height: dict_u32(doc, dict, b"Height"),
        bits_per_component: dict_u32(doc, dict, b"BitsPerComponent"),
        color_space,
        components,
        filter,
        smask: dict.get(b"SMask").and_then(Object::as_reference).ok().map(|r| r.0),
        length: stream.content.len(),
    }
}

fn dict_u32(doc: &Document, dict: &lopdf::Dictionary, key: &[u8]) -> u32 {
    dict_get_number(doc, dict, key).map(|n| n as u32).unwrap_or(0)
}

/// Color space family name and component count.
fn color_space(doc: &Document, obj: Option<&Object>) -> (String, u32) {
    let (family, rest) = match obj {
        Some(Object::Name(n)) => (n.as_slice(), &[][..]),
        Some(Object::Array(items)) => match items.split_first() {
            Some((first, rest)) => match resolve(doc, first) {
                Object::Name(n) => (n.as_slice(), rest),
                _ => return (String::new(), 0),
            },
            None => return (String::new(), 0),
        },
        _ => return (String::new(), 0),
    };
    let components = match family {
        b"DeviceGray" | b"CalGray" | b"G" | b"Indexed" | b"I" | b"Separation" => 1,
        b"DeviceRGB" | b"CalRGB" | b"RGB" | b"Lab" => 3,
        b"DeviceCMYK" | b"CMYK" => 4,
        b"ICCBased" => rest
            .first()
            .and_then(|o| match resolve(doc, o) {
                Object::Stream(s) => dict_get_number(doc, &s.dict, b"N"),
                _ => None,
            })
            .map(|n| n as u32)
            .unwrap_or(0),
        _ => 0,
    };
    (String::from_utf8_lossy(family).to_string(), components)
}

fn image_streams(backend: &LopdfBackend) -> impl Iterator<Item = (ObjectId, &Stream)> {
    backend
        .raw_doc()
        .objects
        .iter()
        .filter_map(|(id, obj)| match obj {
            Object::Stream(s) if is_image(s) => Some((*id, s)),
            _ => None,
        })
}

fn is_image(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image"))
}

/// All image objects, ordered by object number.
pub fn list_images(backend: &LopdfBackend) -> Vec<ImageInfo> {
    let doc = backend.raw_doc();
    image_streams(backend)
        .map(|(id, stream)| image_info(doc, id, stream))
        .collect()
}

/// Image data of object `xref`.
pub fn extract_image(backend: &LopdfBackend, xref: u32) -> Result<ExtractedImage> {
    let doc = backend.raw_doc();
    let (id, stream) = image_streams(backend)
        .find(|(id, _)| id.0 == xref)
        .ok_or_else(|| Error::ResourceNotFound(format!("image object {}", xref)))?;
    let info = image_info(doc, id, stream);

    let (ext, data) = match info.filter.as_str() {
        "DCTDecode" if stream_filters(doc, stream) == 1 => ("jpg", stream.content.clone()),
        "JPXDecode" if stream_filters(doc, stream) == 1 => ("jpx", stream.content.clone()),
        _ => ("png", to_png(&info, &stream_bytes(stream)?)?),
    };
    Ok(ExtractedImage {
        xref,
        ext,
        width: info.width,
        height: info.height,
        data,
    })
}

fn stream_filters(doc: &Document, stream: &Stream) -> usize {
    match dict_get(doc, &stream.dict, b"Filter") {
        Some(Object::Array(items)) => items.len(),
        Some(_) => 1,
        None => 0,
    }
}

/// Encode raw 8-bit gray or RGB samples as PNG.
fn to_png(info: &ImageInfo, samples: &[u8]) -> Result<Vec<u8>> {
    let unsupported = |what: String| {
        Error::ImageExtract(format!("image {}: unsupported {}", info.xref, what))
    };
    if info.bits_per_component != 8 {
        return Err(unsupported(format!("{} bits per component", info.bits_per_component)));
    }
    if info.color_space == "Indexed" || info.color_space == "Separation" {
        return Err(unsupported(format!("color space {}", info.color_space)));
    }
    let needed = info.width as usize * info.height as usize * info.components as usize;
    if samples.len() < needed {
        return Err(Error::ImageExtract(format!(
            "image {}: {} bytes of samples, expected {}",
            info.xref,
            samples.len(),
            needed
        )));
    }
    let samples = samples[..needed].to_vec();
    let image = match info.components {
        1 => GrayImage::from_raw(info.width, info.height, samples).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(info.width, info.height, samples).map(DynamicImage::ImageRgb8),
        n => return Err(unsupported(format!("{} color components", n))),
    }
    .ok_or_else(|| Error::ImageExtract(format!("image {}: invalid dimensions", info.xref)))?;

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Write every significant image to `<dir>/img-<xref>.<ext>`.
///
/// Soft masks are skipped. Images that cannot be converted abort the run
/// in strict mode and are skipped in lenient mode.
pub fn extract_images(
    backend: &LopdfBackend,
    dir: &Path,
    filter: &ImageFilter,
    options: &LoadOptions,
) -> Result<Vec<PathBuf>> {
    let images = list_images(backend);
    let smasks: BTreeSet<u32> = images.iter().filter_map(|i| i.smask).collect();
    let mut written = Vec::new();
    for info in images.iter().filter(|i| !smasks.contains(&i.xref)) {
        let what = format!("image {}", info.xref);
        let Some(image) = options.error_mode.handle(&what, extract_image(backend, info.xref))? else {
            continue;
        };
        if !filter.accepts(info, &image) {
            log::debug!("Ignoring insignificant {}", what);
            continue;
        }
        let path = dir.join(format!("img-{}.{}", image.xref, image.ext));
        std::fs::write(&path, &image.data)?;
        log::debug!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ErrorMode;
    use lopdf::dictionary;

    fn backend_with_images() -> LopdfBackend {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => Vec::<Object>::new(), "Count" => 0 }),
        );
        // 2x2 RGB
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject", "Subtype" => "Image",
                "Width" => 2, "Height" => 2, "BitsPerComponent" => 8,
                "ColorSpace" => "DeviceRGB",
            },
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        ));
        // fake JPEG payload, passed through untouched
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject", "Subtype" => "Image",
                "Width" => 1, "Height" => 1, "BitsPerComponent" => 8,
                "ColorSpace" => "DeviceGray", "Filter" => "DCTDecode",
            },
            vec![0xFF, 0xD8, 0xFF, 0xD9],
        ));
        // 1-bit image, not convertible
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject", "Subtype" => "Image",
                "Width" => 8, "Height" => 1, "BitsPerComponent" => 1,
                "ColorSpace" => "DeviceGray",
            },
            vec![0b1010_1010],
        ));
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        LopdfBackend::from_document(doc)
    }

    #[test]
    fn test_list_images() {
        let images = list_images(&backend_with_images());
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].components, 3);
        assert_eq!(images[1].filter, "DCTDecode");
        assert_eq!(images[2].bits_per_component, 1);
    }

    #[test]
    fn test_extract_image() {
        let backend = backend_with_images();
        let xrefs: Vec<u32> = list_images(&backend).iter().map(|i| i.xref).collect();

        let png = extract_image(&backend, xrefs[0]).unwrap();
        assert_eq!(png.ext, "png");
        let decoded = image::load_from_memory(&png.data).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 255, 0]);

        let jpg = extract_image(&backend, xrefs[1]).unwrap();
        assert_eq!(jpg.ext, "jpg");
        assert_eq!(jpg.data, [0xFF, 0xD8, 0xFF, 0xD9]);

        assert!(matches!(
            extract_image(&backend, xrefs[2]),
            Err(Error::ImageExtract(_))
        ));
    }

    #[test]
    fn test_extract_images_lenient() {
        let backend = backend_with_images();
        let dir = tempfile::tempdir().unwrap();

        let strict = LoadOptions::default();
        assert!(extract_images(&backend, dir.path(), &ImageFilter::none(), &strict).is_err());

        let lenient = LoadOptions::new().with_error_mode(ErrorMode::Lenient);
        let written = extract_images(&backend, dir.path(), &ImageFilter::none(), &lenient).unwrap();
        assert_eq!(written.len(), 2);

        let significant = extract_images(&backend, dir.path(), &ImageFilter::significant(), &lenient).unwrap();
        assert!(significant.is_empty());
    }
}
