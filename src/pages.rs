//! Page selection and page geometry.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Matrix, Rect};

/// Which pages an operation should visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed, sorted, deduplicated)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// The selected page numbers of a document with `page_count` pages.
    ///
    /// Pages outside the document are an error rather than silently ignored.
    pub fn resolve(&self, page_count: u32) -> Result<Vec<u32>> {
        let pages: Vec<u32> = match self {
            PageSelection::All => (1..=page_count).collect(),
            PageSelection::Range(range) => range.clone().collect(),
            PageSelection::Pages(pages) => pages.clone(),
        };
        if let Some(&bad) = pages.iter().find(|&&p| p == 0 || p > page_count) {
            return Err(Error::PageOutOfRange(bad, page_count));
        }
        Ok(pages)
    }

    /// Parse a page selection string (e.g., "all", "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        let invalid = |part: &str| Error::InvalidPageRange(format!("'{}' in '{}'", part, s));
        let number = |part: &str| -> Result<u32> {
            match part.trim().parse::<u32>() {
                Ok(0) | Err(_) => Err(invalid(part)),
                Ok(n) => Ok(n),
            }
        };

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(invalid(s));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            if let Some((start, end)) = part.split_once('-') {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(invalid(part));
                }
                pages.extend(start..=end);
            } else {
                pages.push(number(part)?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

impl std::str::FromStr for PageSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PageSelection::parse(s)
    }
}

/// Physical layout of one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// 1-indexed page number
    pub number: u32,
    /// Visible box in PDF user space (CropBox, else MediaBox), normalized
    pub cropbox: Rect,
    /// The MediaBox in PDF user space, normalized
    pub mediabox: Rect,
    /// Display rotation in degrees: 0, 90, 180 or 270
    pub rotation: i32,
}

impl PageGeometry {
    /// Create page geometry, normalizing the rotation to a multiple of 90.
    pub fn new(number: u32, mediabox: Rect, cropbox: Option<Rect>, rotation: i64) -> Self {
        let mediabox = mediabox.normalize();
        let cropbox = cropbox
            .map(|c| c.normalize())
            .and_then(|c| c.intersection(&mediabox))
            .unwrap_or(mediabox);
        let rotation = (((rotation / 90) * 90) % 360 + 360) % 360;
        Self {
            number,
            cropbox,
            mediabox,
            rotation: rotation as i32,
        }
    }

    /// A US-Letter page without rotation.
    pub fn letter(number: u32) -> Self {
        Self::new(number, Rect::new(0.0, 0.0, 612.0, 792.0), None, 0)
    }

    /// Displayed width (after rotation).
    pub fn width(&self) -> f32 {
        if self.is_sideways() {
            self.cropbox.height()
        } else {
            self.cropbox.width()
        }
    }

    /// Displayed height (after rotation).
    pub fn height(&self) -> f32 {
        if self.is_sideways() {
            self.cropbox.width()
        } else {
            self.cropbox.height()
        }
    }

    fn is_sideways(&self) -> bool {
        self.rotation == 90 || self.rotation == 270
    }

    /// The page rectangle in page coordinates.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width(), self.height())
    }

    /// Maps PDF user space to page coordinates (top-left origin, y down,
    /// rotation applied).
    pub fn matrix(&self) -> Matrix {
        let Rect { x0, y0, x1, y1 } = self.cropbox;
        match self.rotation {
            90 => Matrix::new(0.0, 1.0, 1.0, 0.0, -y0, -x0),
            180 => Matrix::new(-1.0, 0.0, 0.0, 1.0, x1, -y0),
            270 => Matrix::new(0.0, -1.0, -1.0, 0.0, y1, x1),
            _ => Matrix::new(1.0, 0.0, 0.0, -1.0, -x0, y1),
        }
    }

    /// Maps page coordinates back to PDF user space.
    pub fn inverse_matrix(&self) -> Matrix {
        // page matrices are orthonormal, never singular
        self.matrix().invert().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_page_selection_includes() {
        assert!(PageSelection::All.includes(100));

        let range = PageSelection::Range(5..=10);
        assert!(!range.includes(4));
        assert!(range.includes(10));

        let pages = PageSelection::Pages(vec![1, 3, 5, 7]);
        assert!(pages.includes(3));
        assert!(!pages.includes(2));
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(
            PageSelection::parse("1-10").unwrap(),
            PageSelection::Range(1..=10)
        );
        assert_eq!(
            PageSelection::parse("7, 1,3,5-7").unwrap(),
            PageSelection::Pages(vec![1, 3, 5, 6, 7])
        );
    }

    #[test]
    fn test_page_selection_parse_errors() {
        assert!(matches!(
            PageSelection::parse("abc"),
            Err(Error::InvalidPageRange(_))
        ));
        assert!(PageSelection::parse("0").is_err());
        assert!(PageSelection::parse("5-2").is_err());
    }

    #[test]
    fn test_page_selection_resolve() {
        assert_eq!(PageSelection::All.resolve(3).unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            PageSelection::Range(2..=4).resolve(3),
            Err(Error::PageOutOfRange(4, 3))
        ));
    }

    #[test]
    fn test_page_matrix_unrotated() {
        let geo = PageGeometry::letter(1);
        let p = Point::new(72.0, 720.0) * geo.matrix();
        assert_eq!(p, Point::new(72.0, 72.0));
        assert_eq!(geo.rect(), Rect::new(0.0, 0.0, 612.0, 792.0));
    }

    #[test]
    fn test_page_matrix_rotated() {
        let geo = PageGeometry::new(1, Rect::new(0.0, 0.0, 612.0, 792.0), None, 90);
        assert_eq!(geo.width(), 792.0);
        assert_eq!(geo.height(), 612.0);
        // bottom-left corner shows up at the top-left when turned clockwise
        assert_eq!(Point::new(0.0, 0.0) * geo.matrix(), Point::new(0.0, 0.0));
        assert_eq!(
            Point::new(612.0, 0.0) * geo.matrix(),
            Point::new(0.0, 612.0)
        );

        let geo = PageGeometry::new(1, Rect::new(0.0, 0.0, 612.0, 792.0), None, -90);
        assert_eq!(geo.rotation, 270);
        let back = Point::new(10.0, 20.0) * geo.matrix() * geo.inverse_matrix();
        assert!((back.x - 10.0).abs() < 1e-3 && (back.y - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_cropbox_clipped_to_mediabox() {
        let geo = PageGeometry::new(
            1,
            Rect::new(0.0, 0.0, 612.0, 792.0),
            Some(Rect::new(50.0, 50.0, 700.0, 500.0)),
            0,
        );
        assert_eq!(geo.cropbox, Rect::new(50.0, 50.0, 612.0, 500.0));
        assert_eq!(
            Point::new(50.0, 500.0) * geo.matrix(),
            Point::new(0.0, 0.0)
        );
    }
}
