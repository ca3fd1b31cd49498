//! Vector path extraction.
//!
//! Recovers the draw commands of a content stream in page coordinates: lines,
//! Bézier curves, rectangles and (for rotated rectangles) quads, grouped into
//! the paths painted by `S`, `f`, `B` and friends.

use serde::{Deserialize, Serialize};

use super::ops;
use super::state::{Color, GraphicsStack};
use crate::backend::ContentOp;
use crate::error::Result;
use crate::geometry::{Matrix, Point, Quad, Rect};
use crate::pages::PageGeometry;

/// One drawing command of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PathItem {
    Line { from: Point, to: Point },
    Curve { p1: Point, c1: Point, c2: Point, p2: Point },
    Rect { rect: Rect },
    Quad { quad: Quad },
}

impl PathItem {
    /// Bounding rectangle (curves use their control polygon).
    pub fn rect(&self) -> Rect {
        match self {
            PathItem::Line { from, to } => Rect::from_points(*from, *to),
            PathItem::Curve { p1, c1, c2, p2 } => {
                let mut r = Rect::from_points(*p1, *p2);
                r.include_point(*c1);
                r.include_point(*c2);
                r
            }
            PathItem::Rect { rect } => *rect,
            PathItem::Quad { quad } => quad.rect(),
        }
    }
}

/// How a path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintKind {
    Stroke,
    Fill,
    FillStroke,
}

/// A painted path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawPath {
    pub items: Vec<PathItem>,
    /// Bounding rectangle of all items
    pub rect: Rect,
    pub kind: PaintKind,
    /// Stroke colour, `None` for fill-only paths
    pub color: Option<Color>,
    /// Fill colour, `None` for stroke-only paths
    pub fill: Option<Color>,
    /// Stroke width in page units, `None` for fill-only paths
    pub width: Option<f32>,
    pub line_join: i64,
    pub line_cap: i64,
    pub dashes: String,
    pub close_path: bool,
    pub even_odd: bool,
    /// Position of the painting operator in the stream
    pub seqno: usize,
}

/// Path under construction.
#[derive(Debug, Default)]
struct PathBuilder {
    items: Vec<PathItem>,
    current: Option<Point>,
    start: Option<Point>,
    closed: bool,
}

impl PathBuilder {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn move_to(&mut self, p: Point) {
        self.current = Some(p);
        self.start = Some(p);
    }

    fn current(&self, op: &ContentOp, index: usize) -> Result<Point> {
        self.current
            .ok_or_else(|| ops::syntax_error(op, index, "no current point"))
    }

    fn close(&mut self) {
        if let (Some(cur), Some(start)) = (self.current, self.start) {
            if cur != start {
                self.items.push(PathItem::Line {
                    from: cur,
                    to: start,
                });
            }
            self.current = Some(start);
        }
        self.closed = true;
    }

    fn take(&mut self) -> PathBuilder {
        std::mem::take(self)
    }
}

/// Extract the painted paths of a decoded content stream.
///
/// Coordinates are page coordinates (`point * ctm * page matrix`). Text
/// objects and inline images are skipped; malformed operands raise
/// [`crate::Error::ContentSyntax`], unbalanced `q`/`Q` the corresponding
/// state errors.
pub fn extract_paths(content: &[ContentOp], page: &PageGeometry) -> Result<Vec<DrawPath>> {
    let page_matrix = page.matrix();
    let mut stack = GraphicsStack::new();
    let mut path = PathBuilder::default();
    let mut paths = Vec::new();
    let mut in_text = false;

    for (index, op) in content.iter().enumerate() {
        match op.operator.as_str() {
            // inline images arrive as one self-contained operation
            "BI" => continue,
            "BT" => {
                in_text = true;
                continue;
            }
            "ET" => {
                in_text = false;
                continue;
            }
            _ => {}
        }

        if stack.apply(op, index)? {
            continue;
        }
        if in_text {
            continue;
        }

        let m = stack.current().ctm.concat(&page_matrix);
        let to_page = |x: f32, y: f32| ops::transform(x, y, &m);

        match op.operator.as_str() {
            "m" => {
                let (x, y) = ops::point(op, index)?;
                path.move_to(to_page(x, y));
            }
            "l" => {
                let (x, y) = ops::point(op, index)?;
                let from = path.current(op, index)?;
                let to = to_page(x, y);
                path.items.push(PathItem::Line { from, to });
                path.current = Some(to);
            }
            "c" => {
                let [x1, y1, x2, y2, x3, y3] = ops::numbers::<6>(op, index)?;
                let p1 = path.current(op, index)?;
                let p2 = to_page(x3, y3);
                path.items.push(PathItem::Curve {
                    p1,
                    c1: to_page(x1, y1),
                    c2: to_page(x2, y2),
                    p2,
                });
                path.current = Some(p2);
            }
            "v" => {
                let [x2, y2, x3, y3] = ops::numbers::<4>(op, index)?;
                let p1 = path.current(op, index)?;
                let p2 = to_page(x3, y3);
                path.items.push(PathItem::Curve {
                    p1,
                    c1: p1,
                    c2: to_page(x2, y2),
                    p2,
                });
                path.current = Some(p2);
            }
            "y" => {
                let [x1, y1, x3, y3] = ops::numbers::<4>(op, index)?;
                let p1 = path.current(op, index)?;
                let p2 = to_page(x3, y3);
                path.items.push(PathItem::Curve {
                    p1,
                    c1: to_page(x1, y1),
                    c2: p2,
                    p2,
                });
                path.current = Some(p2);
            }
            "re" => {
                let [x, y, w, h] = ops::numbers::<4>(op, index)?;
                let user = Rect::new(x, y, x + w, y + h);
                let item = if m.is_rectilinear() {
                    PathItem::Rect {
                        rect: user.transform(&m),
                    }
                } else {
                    PathItem::Quad {
                        quad: user.quad().transform(&m),
                    }
                };
                path.items.push(item);
                path.move_to(to_page(x, y));
            }
            "h" => path.close(),
            "n" => {
                path.take();
            }
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                if matches!(op.operator.as_str(), "s" | "b" | "b*") {
                    path.close();
                }
                let built = path.take();
                if built.is_empty() {
                    continue;
                }
                paths.push(finish_path(built, op.operator.as_str(), &stack, &m, index));
            }
            "W" | "W*" => {}
            other => log::trace!("Ignoring operator '{}' at {}", other, index),
        }
    }

    stack.finish()?;
    Ok(paths)
}

fn finish_path(
    built: PathBuilder,
    operator: &str,
    stack: &GraphicsStack,
    m: &Matrix,
    seqno: usize,
) -> DrawPath {
    let state = stack.current();
    let kind = match operator {
        "S" | "s" => PaintKind::Stroke,
        "f" | "F" | "f*" => PaintKind::Fill,
        _ => PaintKind::FillStroke,
    };
    let strokes = kind != PaintKind::Fill;
    let fills = kind != PaintKind::Stroke;
    // line width scales with the geometric mean of the axis scales
    let scale = (m.a * m.d - m.b * m.c).abs().sqrt();
    let rect = built
        .items
        .iter()
        .map(PathItem::rect)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();

    DrawPath {
        items: built.items,
        rect,
        kind,
        color: strokes.then_some(state.stroke_color),
        fill: fills.then_some(state.fill_color),
        width: strokes.then_some(state.line_width * scale),
        line_join: state.line_join,
        line_cap: state.line_cap,
        dashes: state.dashes.clone(),
        close_path: built.closed,
        even_odd: operator.ends_with('*'),
        seqno,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::decode_content;
    use crate::error::Error;

    fn paths(data: &[u8]) -> Result<Vec<DrawPath>> {
        let ops = decode_content(data).unwrap();
        extract_paths(&ops, &PageGeometry::letter(1))
    }

    #[test]
    fn test_stroked_line_in_page_coordinates() {
        let found = paths(b"1 0 0 RG 2 w 72 720 m 144 720 l S").unwrap();
        assert_eq!(found.len(), 1);
        let p = &found[0];
        assert_eq!(p.kind, PaintKind::Stroke);
        assert_eq!(p.color, Some(Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(p.fill, None);
        assert_eq!(p.width, Some(2.0));
        assert_eq!(
            p.items,
            vec![PathItem::Line {
                from: Point::new(72.0, 72.0),
                to: Point::new(144.0, 72.0)
            }]
        );
        assert_eq!(p.rect, Rect::new(72.0, 72.0, 144.0, 72.0));
    }

    #[test]
    fn test_filled_rect_under_cm() {
        let found = paths(b"q 2 0 0 2 0 0 cm 0 0 1 rg 10 10 20 30 re f Q").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PaintKind::Fill);
        assert_eq!(found[0].color, None);
        assert_eq!(found[0].fill, Some(Color::rgb(0.0, 0.0, 1.0)));
        assert_eq!(
            found[0].items,
            vec![PathItem::Rect {
                rect: Rect::new(20.0, 712.0, 60.0, 772.0)
            }]
        );
    }

    #[test]
    fn test_rotated_rect_becomes_quad() {
        let found = paths(b"0.7071 0.7071 -0.7071 0.7071 300 300 cm 0 0 50 50 re S").unwrap();
        assert!(matches!(found[0].items[0], PathItem::Quad { .. }));
    }

    #[test]
    fn test_close_and_even_odd() {
        let found = paths(b"0 0 m 10 0 l 10 10 l b*").unwrap();
        let p = &found[0];
        assert!(p.close_path);
        assert!(p.even_odd);
        assert_eq!(p.kind, PaintKind::FillStroke);
        assert_eq!(p.items.len(), 3);
    }

    #[test]
    fn test_curves_and_discarded_paths() {
        let found = paths(b"0 0 m 10 10 20 10 30 0 c 40 10 50 0 v S 0 0 m 5 5 l n").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].items.len(), 2);
        let PathItem::Curve { p1, c1, .. } = &found[0].items[1] else {
            panic!("expected a curve");
        };
        // 'v' duplicates the current point as first control point
        assert_eq!(p1, c1);
    }

    #[test]
    fn test_text_objects_are_skipped() {
        let found = paths(b"BT /F1 12 Tf 0 0 Td (x) Tj ET 0 0 10 10 re f").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_inline_images_are_skipped() {
        let plain = paths(
            b"q 10 0 0 10 100 100 cm BI /W 2 /H 1 /CS /DeviceGray /BPC 8 ID \x01\x02 EI Q \
              0 0 1 rg 10 10 50 50 re f",
        )
        .unwrap();
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].fill, Some(Color::rgb(0.0, 0.0, 1.0)));
        // the cm inside q/Q no longer applies to the rectangle
        assert!((plain[0].rect.x0 - 10.0).abs() < 1e-3);

        let filtered = paths(
            b"q BI /W 2 /H 1 /CS /G /BPC 8 /F /AHx ID 0102> EI Q 10 10 50 50 re f",
        )
        .unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_bad_operand_count_is_reported() {
        let err = paths(b"10 10 20 re f").unwrap_err();
        match err {
            Error::ContentSyntax {
                operator, index, ..
            } => {
                assert_eq!(operator, "re");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(paths(b"10 10 l S"), Err(Error::ContentSyntax { .. })));
    }

    #[test]
    fn test_unbalanced_state_is_reported() {
        assert!(matches!(paths(b"q 0 0 m 1 1 l S"), Err(Error::UnclosedSave(1))));
        assert!(matches!(paths(b"Q"), Err(Error::UnbalancedRestore(0))));
    }
}
