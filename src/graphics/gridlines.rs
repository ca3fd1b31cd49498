//! Table border detection from vector lines.

use serde::{Deserialize, Serialize};

use crate::content::{DrawPath, PathItem};
use crate::geometry::Rect;

/// Coordinates closer than this are the same border.
const MERGE_DISTANCE: f32 = 0.5;

/// Rectangles at most this thick count as lines.
const THIN: f32 = 3.0;

/// ... and must be longer than this.
const MIN_LENGTH: f32 = 10.0;

/// Column and row borders of a ruled table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridLines {
    /// x coordinates of vertical borders, ascending
    pub columns: Vec<f32>,
    /// y coordinates of horizontal borders, ascending
    pub rows: Vec<f32>,
}

impl GridLines {
    /// Number of cells in each direction: (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (
            self.rows.len().saturating_sub(1),
            self.columns.len().saturating_sub(1),
        )
    }

    /// Cell (row, column) that completely contains `bbox`.
    pub fn cell_of(&self, bbox: &Rect) -> Option<(usize, usize)> {
        let col = self
            .columns
            .windows(2)
            .position(|w| w[0] <= bbox.x0 && bbox.x1 <= w[1])?;
        let row = self
            .rows
            .windows(2)
            .position(|w| w[0] <= bbox.y0 && bbox.y1 <= w[1])?;
        Some((row, col))
    }
}

/// Collect the borders drawn inside `clip`.
///
/// Horizontal and vertical lines count, and so do thin rectangles that are
/// often used to draw rules.
pub fn gridlines(paths: &[DrawPath], clip: &Rect) -> GridLines {
    let mut columns = Vec::new();
    let mut rows = Vec::new();

    for path in paths.iter().filter(|p| clip.contains(&p.rect)) {
        for item in &path.items {
            match item {
                PathItem::Line { from, to } => {
                    if (from.x - to.x).abs() < f32::EPSILON * 16.0 {
                        columns.push(from.x);
                    } else if (from.y - to.y).abs() < f32::EPSILON * 16.0 {
                        rows.push(from.y);
                    }
                }
                PathItem::Rect { rect } => {
                    if rect.width() <= THIN && rect.height() > MIN_LENGTH {
                        columns.push(rect.x0);
                    } else if rect.height() <= THIN && rect.width() > MIN_LENGTH {
                        rows.push(rect.y1);
                    }
                }
                _ => {}
            }
        }
    }

    GridLines {
        columns: sorted_unique(columns),
        rows: sorted_unique(rows),
    }
}

fn sorted_unique(mut values: Vec<f32>) -> Vec<f32> {
    values.sort_by(f32::total_cmp);
    values.dedup_by(|b, a| (*b - *a).abs() < MERGE_DISTANCE);
    values
}
