//! Figure detection: regions of a page covered by connected vector graphics.

use std::path::{Path, PathBuf};

use super::joiner::{join_rects, JoinOptions};
use crate::content::DrawPath;
use crate::error::Result;
use crate::geometry::Rect;
use crate::ocr::RegionRenderer;

/// How paths are filtered and joined into regions.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOptions {
    /// Neighbour tolerance passed to the joiner
    pub tolerance: f32,
    /// Path rectangles are enlarged by this much on every side before joining
    pub enlarge: f32,
    /// Only paths inside the page rectangle enlarged by this margin count
    pub margin: Option<f32>,
    /// Paths covering at least this fraction of the page are ignored
    /// (full-page backgrounds)
    pub max_page_fraction: Option<f32>,
    /// Joined regions must be wider and taller than this
    pub min_size: f32,
    /// Resolution for exported images
    pub dpi: u32,
    /// File name prefix for exported images
    pub prefix: String,
}

impl RegionOptions {
    /// Join paths lying near each other (within 2 points), ignoring paths
    /// outside a 36 point margin around the page.
    pub fn neighborhood() -> Self {
        Self {
            tolerance: 2.0,
            enlarge: 0.0,
            margin: Some(36.0),
            max_page_fraction: None,
            min_size: 5.0,
            dpi: 150,
            prefix: "graphic".to_string(),
        }
    }

    /// Join paths that touch once enlarged by one point, ignoring paths that
    /// cover most of the page.
    pub fn touching() -> Self {
        Self {
            tolerance: 0.0,
            enlarge: 1.0,
            margin: None,
            max_page_fraction: Some(0.8),
            min_size: 5.0,
            dpi: 216,
            prefix: "drawing".to_string(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_min_size(mut self, min_size: f32) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self::neighborhood()
    }
}

/// Regions of `page_rect` covered by the given paths.
pub fn detect_regions(paths: &[DrawPath], page_rect: &Rect, options: &RegionOptions) -> Vec<Rect> {
    let allowed = options.margin.map(|m| page_rect.expand(m));
    let max_area = options.max_page_fraction.map(|f| page_rect.area() * f);

    let rects: Vec<Rect> = paths
        .iter()
        .filter(|p| allowed.map_or(true, |a| a.contains(&p.rect)))
        .filter(|p| max_area.map_or(true, |max| p.rect.area() < max))
        .map(|p| {
            if options.enlarge > 0.0 {
                p.rect.expand(options.enlarge).round_out()
            } else {
                p.rect
            }
        })
        .collect();

    let joined = join_rects(&rects, JoinOptions::new().with_tolerance(options.tolerance));
    log::debug!(
        "Joined {} path rectangle(s) into {} region(s)",
        rects.len(),
        joined.len()
    );
    joined
        .into_iter()
        .filter(|r| r.width() > options.min_size && r.height() > options.min_size)
        .collect()
}

/// Rasterize each region to `<dir>/<prefix>-PPP-NN.png` (0-based page and
/// region numbers).
pub fn export_regions<R: RegionRenderer + ?Sized>(
    renderer: &R,
    page_number: u32,
    regions: &[Rect],
    options: &RegionOptions,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(regions.len());
    for (i, region) in regions.iter().enumerate() {
        let png = renderer.render_region(page_number, region, options.dpi, false)?;
        let path = dir.join(format!(
            "{}-{:03}-{:02}.png",
            options.prefix,
            page_number.saturating_sub(1),
            i
        ));
        std::fs::write(&path, png)?;
        log::debug!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
