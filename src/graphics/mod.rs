//! Vector graphics: paths per page, figure regions and table grid lines.

pub mod gridlines;
pub mod joiner;
pub mod regions;

use rayon::prelude::*;

use crate::backend::PdfBackend;
use crate::content::{extract_paths, DrawPath};
use crate::error::Result;
use crate::geometry::Rect;
use crate::options::LoadOptions;
use crate::pages::PageGeometry;

pub use gridlines::{gridlines, GridLines};
pub use joiner::{are_neighbors, join_rects, JoinOptions};
pub use regions::{detect_regions, export_regions, RegionOptions};

/// The painted paths of one page.
pub fn page_paths<B: PdfBackend + ?Sized>(backend: &B, page_number: u32) -> Result<Vec<DrawPath>> {
    let page = backend.page_id(page_number)?;
    let geometry = backend.page_geometry(page_number)?;
    let content = backend.page_content(page)?;
    let ops = backend.decode_content(&content)?;
    extract_paths(&ops, &geometry)
}

/// Paths of a page selection, in page order.
///
/// Content streams are read sequentially; decoding and path extraction run
/// in parallel when [`LoadOptions::parallel`] is set.
pub fn document_paths<B: PdfBackend + ?Sized>(
    backend: &B,
    options: &LoadOptions,
) -> Result<Vec<(u32, Vec<DrawPath>)>> {
    let numbers = options.pages.resolve(backend.page_count())?;
    let mut inputs: Vec<(u32, PageGeometry, Vec<u8>)> = Vec::with_capacity(numbers.len());
    for number in numbers {
        let fetched = backend
            .page_id(number)
            .and_then(|id| Ok((backend.page_geometry(number)?, backend.page_content(id)?)));
        if let Some((geometry, content)) = options
            .error_mode
            .handle(format_args!("page {}", number), fetched)?
        {
            inputs.push((number, geometry, content));
        }
    }

    let scan = |(number, geometry, content): (u32, PageGeometry, Vec<u8>)| {
        let paths = crate::backend::decode_content(&content)
            .and_then(|ops| extract_paths(&ops, &geometry));
        (number, paths)
    };
    let scanned: Vec<(u32, Result<Vec<DrawPath>>)> = if options.parallel {
        inputs.into_par_iter().map(scan).collect()
    } else {
        inputs.into_iter().map(scan).collect()
    };

    let mut pages = Vec::with_capacity(scanned.len());
    for (number, paths) in scanned {
        log::debug!("Scanned drawings of page {}", number);
        if let Some(paths) = options
            .error_mode
            .handle(format_args!("page {}", number), paths)?
        {
            pages.push((number, paths));
        }
    }
    Ok(pages)
}

/// Figure regions of one page.
pub fn page_regions<B: PdfBackend + ?Sized>(
    backend: &B,
    page_number: u32,
    options: &RegionOptions,
) -> Result<Vec<Rect>> {
    let geometry = backend.page_geometry(page_number)?;
    let paths = page_paths(backend, page_number)?;
    Ok(detect_regions(&paths, &geometry.rect(), options))
}
